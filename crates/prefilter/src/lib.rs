//! Junk-call prefilter.
//!
//! Screens a raw call transcript before any attribution work is attempted.
//! Voicemails, dropped calls, and near-empty calls short-circuit the
//! pipeline; anything mentioning a substantive construction topic fails
//! open and proceeds to routing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Thresholds for the low-content junk signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefilterConfig {
    pub min_word_count: usize,
    pub short_duration_seconds: i64,
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self {
            min_word_count: 20,
            short_duration_seconds: 15,
        }
    }
}

/// Voicemail greetings are an absolute junk signal on short calls; no
/// substantive-topic term rescues them.
static VOICEMAIL_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        (
            "voicemail_leave_message",
            Regex::new(r"(?i)\bleave (?:me )?(?:a )?message\b").expect("voicemail pattern"),
        ),
        (
            "voicemail_mailbox_full",
            Regex::new(r"(?i)\bmailbox is (?:full|not set up)\b").expect("voicemail pattern"),
        ),
        (
            "voicemail_not_available",
            Regex::new(r"(?i)\b(?:cannot|can't|unable to)\s+take your call\b")
                .expect("voicemail pattern"),
        ),
        (
            "voicemail_after_tone",
            Regex::new(r"(?i)\bafter the tone\b").expect("voicemail pattern"),
        ),
        (
            "voicemail_record_message",
            Regex::new(r"(?i)\bplease record your message\b").expect("voicemail pattern"),
        ),
    ]
});

static CONNECTION_FAILURE_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        (
            "connection_bad_service",
            Regex::new(r"(?i)\bbad service\b").expect("connection pattern"),
        ),
        (
            "connection_call_dropped",
            Regex::new(r"(?i)\bcall (?:dropped|failed|disconnected)\b")
                .expect("connection pattern"),
        ),
        (
            "connection_cant_hear",
            Regex::new(r"(?i)\b(?:can you|can't|cannot)\s+hear (?:me|you)\b")
                .expect("connection pattern"),
        ),
    ]
});

/// Substantive construction topics suppress the low-signal junk rules.
static SUBSTANTIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bestimate\b",
        r"(?i)\bproposal\b",
        r"(?i)\bcontract\b",
        r"(?i)\binvoice\b",
        r"(?i)\bdeposit\b",
        r"(?i)\bpermit\b",
        r"(?i)\bschedule\b",
        r"(?i)\bchange order\b",
        r"(?i)\binstall(?:ation)?\b",
        r"(?i)\bcabinet(?:s)?\b",
        r"(?i)\bcountertop(?:s)?\b",
        r"(?i)\btile\b",
        r"(?i)\bplumbing\b",
        r"(?i)\belectrical\b",
        r"\$\s*\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("substantive pattern"))
    .collect()
});

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[a-z0-9']+").expect("word regex"));
static SPEAKER_TURN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\s*:").expect("speaker turn regex")
});

/// Prefilter verdict plus the raw signals it was derived from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrefilterReport {
    pub is_junk: bool,
    pub reason_codes: Vec<String>,
    pub signal_summary: Vec<String>,
    pub word_count: usize,
    pub speaker_turns: usize,
    pub duration_seconds: Option<i64>,
}

/// Normalize a reported call duration. Non-positive and non-finite values
/// are unknown; values over 10,000 are taken to be milliseconds.
#[must_use]
pub fn normalize_duration_seconds(raw: Option<f64>) -> Option<i64> {
    let num = raw?;
    if !num.is_finite() || num <= 0.0 {
        return None;
    }
    if num > 10_000.0 {
        return Some((num / 1000.0).round() as i64);
    }
    Some(num.round() as i64)
}

fn count_words(transcript: &str) -> usize {
    WORD_RE.find_iter(transcript).count()
}

fn count_speaker_turns(transcript: &str) -> usize {
    SPEAKER_TURN_RE.find_iter(transcript).count()
}

/// Evaluate the junk-call prefilter over a raw transcript.
#[must_use]
pub fn evaluate(
    transcript: Option<&str>,
    duration_seconds: Option<f64>,
    config: &PrefilterConfig,
) -> PrefilterReport {
    let transcript = transcript.unwrap_or("").trim();
    let duration_seconds = normalize_duration_seconds(duration_seconds);

    let word_count = count_words(transcript);
    let speaker_turns = count_speaker_turns(transcript);
    let low_word_count = word_count > 0 && word_count < config.min_word_count;
    let single_speaker_turn = speaker_turns <= 1;
    let short_duration =
        duration_seconds.is_some_and(|d| d < config.short_duration_seconds);

    let voicemail_hits: Vec<&str> = VOICEMAIL_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(transcript))
        .map(|(code, _)| *code)
        .collect();
    let connection_hits: Vec<&str> = CONNECTION_FAILURE_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(transcript))
        .map(|(code, _)| *code)
        .collect();
    let has_substantive_signal = SUBSTANTIVE_PATTERNS.iter().any(|re| re.is_match(transcript));

    let junk_by_voicemail = !voicemail_hits.is_empty() && word_count <= 80;
    let junk_by_connection_failure =
        !connection_hits.is_empty() && word_count <= 40 && !has_substantive_signal;
    let junk_by_minimal_content =
        low_word_count && (single_speaker_turn || short_duration) && !has_substantive_signal;
    let is_junk = junk_by_voicemail || junk_by_connection_failure || junk_by_minimal_content;

    let mut reason_codes: Vec<String> = Vec::new();
    let push_reason = |codes: &mut Vec<String>, code: &str| {
        if !codes.iter().any(|c| c == code) {
            codes.push(code.to_string());
        }
    };
    if is_junk {
        push_reason(&mut reason_codes, "junk_call_filtered");
        if junk_by_voicemail {
            push_reason(&mut reason_codes, "voicemail_pattern");
        }
        if junk_by_connection_failure {
            push_reason(&mut reason_codes, "connection_failure_pattern");
        }
        if low_word_count {
            push_reason(&mut reason_codes, "low_word_count");
        }
        if single_speaker_turn {
            push_reason(&mut reason_codes, "single_speaker_turn");
        }
        if short_duration {
            push_reason(&mut reason_codes, "short_duration");
        }
    }

    let mut signal_summary = vec![
        format!("word_count={word_count}"),
        format!("speaker_turns={speaker_turns}"),
    ];
    if let Some(d) = duration_seconds {
        signal_summary.push(format!("duration_seconds={d}"));
    }
    if !voicemail_hits.is_empty() {
        signal_summary.push(format!("voicemail_hits={}", voicemail_hits.join("|")));
    }
    if !connection_hits.is_empty() {
        signal_summary.push(format!("connection_hits={}", connection_hits.join("|")));
    }
    if has_substantive_signal {
        signal_summary.push("substantive_signal_present".to_string());
    }

    log::debug!(
        "prefilter: junk={is_junk} words={word_count} turns={speaker_turns} reasons={}",
        reason_codes.join(",")
    );

    PrefilterReport {
        is_junk,
        reason_codes,
        signal_summary,
        word_count,
        speaker_turns,
        duration_seconds,
    }
}
