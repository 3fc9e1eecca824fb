use regex::Regex;
use std::sync::LazyLock;

use crate::models::SongData;

const EXCERPT_CHARS: usize = 200;
const FALLBACK_EXCERPT_CHARS: usize = 100;

static SPEAK_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<speak>.*?</speak>").expect("valid regex"));
static PARENTHETICAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("valid regex"));
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*[^*]*\*\*").expect("valid regex"));
static BRACKETED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));
static ANNOTATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:Reasoning|DJ):[^<]*").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static BETWEEN_TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").expect("valid regex"));

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Prompt for the show's opening script, built from every song's transcript.
pub fn intro_prompt(songs: &[SongData]) -> String {
    let transcripts = songs
        .iter()
        .map(|song| {
            let excerpt = if song.transcript.chars().count() > EXCERPT_CHARS {
                format!("{}...", truncate_chars(&song.transcript, EXCERPT_CHARS).trim_end())
            } else {
                song.transcript.clone()
            };
            format!("Song: {}\nTranscript Excerpt: \"{}\"\n", song.song_name, excerpt)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You're an enthusiastic, vibrant radio DJ known for energetic, poetic intros.\n\n\
         TASK:\n\
         Craft an energetic, poetic and captivating radio intro script (max 80 words).\n\n\
         TONE & STYLE:\n\
         - Uplifting, lively and passionate\n\
         - Expressive, using vivid imagery or dynamic storytelling\n\
         - Naturally conversational and spontaneous\n\n\
         SONG TRANSCRIPTS:\n\
         {transcripts}\n\n\
         INSTRUCTIONS:\n\
         - Greet listeners\n\
         - Set a mood that matches the lyrics\n\
         - Introduce the upcoming artist and track at the end\n\
         - Avoid cliches\n\
         - Finish the script; no abrupt endings\n\n\
         Provide ONLY the final radio script with no explanations or formatting."
    )
}

pub fn enhancement_prompt(script: &str) -> String {
    format!(
        "You are a voice production expert. Enhance this radio script with SSML markers for dynamic speech.\n\n\
         Original script:\n\
         {script}\n\n\
         Return ONLY the SSML-enhanced script in this format:\n\
         <speak>\n\
         <prosody rate=\"fast\" pitch=\"+25%\"><emphasis level=\"strong\">[HIGH ENERGY OPENING]</emphasis></prosody>\n\
         <break time=\"800ms\"/>\n\
         [REST OF SCRIPT WITH APPROPRIATE EMPHASIS AND PACING]\n\
         </speak>\n\n\
         Guidelines:\n\
         - Add natural pauses between sentences (300ms to 1500ms)\n\
         - Vary the pitch for emphasis (+5% to +40%)\n\
         - Emphasize key words and phrases\n\
         - Keep the original meaning and flow\n\
         - Do not include explanations, sound effects, music cues or DJ annotations\n\
         - End with a closing </speak> tag"
    )
}

/// Pulls the first `<speak>` document out of a model response and strips the
/// commentary models like to leave inside it. Without a document the trimmed
/// response is returned unchanged.
pub fn extract_markup(response: &str) -> String {
    let Some(block) = SPEAK_BLOCK.find(response) else {
        return response.trim().to_string();
    };

    let cleaned = PARENTHETICAL.replace_all(block.as_str(), "");
    let cleaned = BOLD.replace_all(&cleaned, "");
    let cleaned = BRACKETED.replace_all(&cleaned, "");
    let cleaned = ANNOTATION.replace_all(&cleaned, "");
    let cleaned = WHITESPACE.replace_all(&cleaned, " ");
    let cleaned = BETWEEN_TAGS.replace_all(&cleaned, "><");
    cleaned.trim().to_string()
}

/// Inclusive word-count target for a transition length.
pub fn word_range(length: &str) -> (usize, usize) {
    match length {
        "short" => (15, 30),
        "long" => (50, 80),
        _ => (30, 50),
    }
}

pub fn style_instructions(style: &str) -> &'static str {
    match style {
        "energetic" => "Bring high energy, excitement and lively language to energize your listeners!",
        "storytelling" => "Connect the songs through a brief, engaging story.",
        "technical" => "Discuss intriguing musical aspects or production details of the songs.",
        "poetic" => "Use poetic, metaphor-rich language to create an emotional connection.",
        _ => "Use a soothing, relaxed tone, perfect for mellow or late-night sets.",
    }
}

/// First three transcript lines joined into one.
pub fn excerpt(transcript: &str) -> String {
    transcript.split('\n').take(3).collect::<Vec<_>>().join(" ")
}

pub fn transition_prompt(current: &SongData, next: &SongData, style: &str, length: &str) -> String {
    let (min_words, max_words) = word_range(length);
    format!(
        "You are a charismatic radio DJ renowned for captivating transitions between songs.\n\n\
         CURRENT SONG:\n\
         Title: {}\n\
         Artist: {}\n\
         Lyric Excerpt: \"{}\"\n\n\
         NEXT SONG:\n\
         Title: {}\n\
         Artist: {}\n\
         Lyric Excerpt: \"{}\"\n\n\
         INSTRUCTIONS:\n\
         - Highlight the mood or standout theme of the current song\n\
         - Build anticipation for the next track\n\
         - Connect thematic elements seamlessly\n\
         - Length: between {min_words} and {max_words} words\n\
         - Style: {style}\n\n\
         STYLE GUIDELINES:\n\
         {}\n\n\
         Return ONLY the transition script without notes or explanations.",
        current.song_name,
        current.artist,
        excerpt(&current.transcript),
        next.song_name,
        next.artist,
        excerpt(&next.transcript),
        style_instructions(style),
    )
}

pub fn fallback_transition(current: &SongData, next: &SongData) -> String {
    let current_excerpt = excerpt(&current.transcript);
    let next_excerpt = excerpt(&next.transcript);
    format!(
        "That was '{}' by {}, bringing you {}... Next up is '{}' by {}, which {}...",
        current.song_name,
        current.artist,
        truncate_chars(&current_excerpt, FALLBACK_EXCERPT_CHARS),
        next.song_name,
        next.artist,
        truncate_chars(&next_excerpt, FALLBACK_EXCERPT_CHARS),
    )
}

/// Strips quoting from a generated transition and swaps in the templated
/// fallback when it falls well short of the requested length.
pub fn finish_transition(raw: &str, current: &SongData, next: &SongData, length: &str) -> String {
    let script = raw.trim().trim_matches(|c: char| c == '"' || c == '\'');
    let (min_words, _) = word_range(length);
    let words = script.split_whitespace().count();
    // Below 80% of the minimum.
    if words * 5 < min_words * 4 {
        tracing::warn!("Generated transition is too short ({} words), using fallback", words);
        return fallback_transition(current, next);
    }
    script.to_string()
}
