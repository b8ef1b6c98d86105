//! Local urgency and deadline detection for context text.
//!
//! These run without a model so that every analyzed context entry carries
//! an urgency signal and the deadline phrases it mentions, whether or not
//! the AI half of the analysis succeeded.
//!
//! ## Deadline phrase resolution
//!
//! | Phrase | Resolves to |
//! |--------|-------------|
//! | today, tonight, EOD, end of day | today |
//! | tomorrow | today + 1 |
//! | EOW, end of week, this week | first Friday on or after today |
//! | next week | today + 7 |
//! | end of month, this month | last day of the month |
//! | next month | same day next month |
//! | next &lt;weekday&gt; | first such weekday strictly after today |
//! | this &lt;weekday&gt;, by &lt;weekday&gt; | first such weekday on or after today |
//! | in N days / in N weeks | today + N or today + 7N |
//! | YYYY-MM-DD | that date |
//!
//! Leading `by`, `before`, `until`, `due`, `on` and `the` are ignored.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

use smarttodo_core::{UrgencyLevel, UrgencySignal};

const WEEKDAYS: &str = "monday|tuesday|wednesday|thursday|friday|saturday|sunday";

static URGENCY_CUES: Lazy<Vec<(UrgencyLevel, Regex)>> = Lazy::new(|| {
    [
        (
            UrgencyLevel::High,
            r"(?i)\b(?:urgent(?:ly)?|asap|immediately|critical|emergency|right\s+away|as\s+soon\s+as\s+possible|top\s+priority|overdue)\b",
        ),
        (
            UrgencyLevel::Medium,
            r"(?i)\b(?:important|soon|high\s+priority|time[-\s]sensitive|deadline|due)\b",
        ),
        (
            UrgencyLevel::Low,
            r"(?i)\b(?:no\s+rush|no\s+hurry|whenever|when\s+you\s+can|low\s+priority)\b",
        ),
    ]
    .into_iter()
    .map(|(level, pattern)| (level, Regex::new(pattern).expect("static regex")))
    .collect()
});

static DEADLINE_PHRASE: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r"(?ix)
        \b(?:
            # a bare weekday needs a preposition in front of it
            (?:by|before|until|due|on)\s+(?:{WEEKDAYS})
          | (?:(?:by|before|until|due)\s+)?(?:
                (?:next|this)\s+(?:{WEEKDAYS}|week|month)
              | end\s+of\s+(?:the\s+)?(?:day|week|month)
              | in\s+\d{{1,3}}\s+(?:days?|weeks?)
              | tomorrow | today | tonight | eod | eow
              | \d{{4}}-\d{{2}}-\d{{2}}
            )
        )\b"
    );
    Regex::new(&pattern).expect("static regex")
});

/// Scan `text` for urgency cues. The level is the highest one matched.
pub fn detect_urgency(text: &str) -> UrgencySignal {
    let mut level = UrgencyLevel::None;
    let mut cues: Vec<String> = Vec::new();

    for (cue_level, re) in URGENCY_CUES.iter() {
        for m in re.find_iter(text) {
            level = level.max(*cue_level);
            let cue = m.as_str().split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
            if !cues.contains(&cue) {
                cues.push(cue);
            }
        }
    }

    UrgencySignal { level, cues }
}

/// Deadline phrases in order of appearance, original casing kept.
pub fn find_deadline_phrases(text: &str) -> Vec<String> {
    let mut phrases: Vec<String> = Vec::new();
    for m in DEADLINE_PHRASE.find_iter(text) {
        let phrase = m.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
        if !phrases.iter().any(|p| p.eq_ignore_ascii_case(&phrase)) {
            phrases.push(phrase);
        }
    }
    phrases
}

fn days_until(today: NaiveDate, target: Weekday) -> u64 {
    let from = today.weekday().num_days_from_monday();
    let to = target.num_days_from_monday();
    u64::from((7 + to - from) % 7)
}

fn weekday_on_or_after(today: NaiveDate, target: Weekday) -> Option<NaiveDate> {
    today.checked_add_days(Days::new(days_until(today, target)))
}

fn weekday_after(today: NaiveDate, target: Weekday) -> Option<NaiveDate> {
    let days = match days_until(today, target) {
        0 => 7,
        n => n,
    };
    today.checked_add_days(Days::new(days))
}

fn last_day_of_month(today: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = match today.month() {
        12 => (today.year() + 1, 1),
        m => (today.year(), m + 1),
    };
    NaiveDate::from_ymd_opt(year, month, 1)?.pred_opt()
}

/// Resolve one phrase found by [`find_deadline_phrases`] against `today`.
pub fn resolve_deadline_phrase(phrase: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lowered = phrase.to_lowercase();
    let mut words: Vec<&str> = lowered.split_whitespace().collect();
    while matches!(
        words.first(),
        Some(&"by") | Some(&"before") | Some(&"until") | Some(&"due") | Some(&"on") | Some(&"the")
    ) {
        words.remove(0);
    }
    if words.len() > 2 && words[..2] == ["end", "of"] && words[2] == "the" {
        words.remove(2);
    }

    match words.as_slice() {
        ["today"] | ["tonight"] | ["eod"] | ["end", "of", "day"] => Some(today),
        ["tomorrow"] => today.succ_opt(),
        ["eow"] | ["end", "of", "week"] | ["this", "week"] => {
            weekday_on_or_after(today, Weekday::Fri)
        }
        ["next", "week"] => today.checked_add_days(Days::new(7)),
        ["end", "of", "month"] | ["this", "month"] => last_day_of_month(today),
        ["next", "month"] => today.checked_add_months(Months::new(1)),
        ["next", day] => day
            .parse::<Weekday>()
            .ok()
            .and_then(|wd| weekday_after(today, wd)),
        ["in", count, unit] => {
            let count: u64 = count.parse().ok()?;
            let days = if unit.starts_with("week") {
                count.checked_mul(7)?
            } else {
                count
            };
            today.checked_add_days(Days::new(days))
        }
        [word] if word.contains('-') => NaiveDate::parse_from_str(word, "%Y-%m-%d").ok(),
        ["this", day] | [day] => day
            .parse::<Weekday>()
            .ok()
            .and_then(|wd| weekday_on_or_after(today, wd)),
        _ => None,
    }
}

/// The earliest date among `phrases` that is not in the past.
pub fn earliest_deadline(phrases: &[String], today: NaiveDate) -> Option<NaiveDate> {
    phrases
        .iter()
        .filter_map(|p| resolve_deadline_phrase(p, today))
        .filter(|date| *date >= today)
        .min()
}
