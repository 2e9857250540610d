//! Script narration: turns a generated dialogue into voice-assigned
//! utterances, tracks which line is being spoken and owns the global mute.
//!
//! Pipeline:
//! 1. Dialogue → lines (split on newlines, trimmed, blanks dropped)
//! 2. Voices → primary/secondary pair (English preferred)
//! 3. Line → speaker (`Rick:` primary, `Morty:` secondary, else alternate)
//! 4. Utterances → engine, in order, tagged with a script id
//!
//! Engines report progress as [`SpeechEvent`]s which are fed back through
//! [`Narrator::handle_event`].

use tracing::{debug, info};

/// A synthesizer voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Identifier understood by the engine (e.g. espeak-ng `-v` value).
    pub id: String,
    pub name: String,
    /// BCP-47-ish language tag, e.g. `en-US`.
    pub lang: String,
}

impl Voice {
    pub fn new(id: &str, name: &str, lang: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lang: lang.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub script: u64,
    pub index: usize,
    pub text: String,
    pub voice: Voice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEvent {
    Started { script: u64, index: usize },
    Ended { script: u64, index: usize },
}

/// Something that can speak queued utterances one after another.
pub trait SpeechEngine {
    fn voices(&self) -> Vec<Voice>;

    /// Queue an utterance behind any already queued.
    fn speak(&mut self, utterance: Utterance);

    /// Stop the current utterance and drop everything queued.
    fn cancel(&mut self);
}

/// Which of the two voices speaks a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine<'a> {
    pub index: usize,
    pub speaker: Speaker,
    /// Text handed to the synthesizer (speaker prefix removed).
    pub text: &'a str,
}

/// Non-empty, trimmed lines of a dialogue in script order.
pub fn script_lines(dialogue: &str) -> Vec<&str> {
    dialogue
        .split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

/// Resolve the speaker for the line at `index`.
pub fn assign_speaker(index: usize, line: &str) -> ScriptLine<'_> {
    if let Some(rest) = line.strip_prefix("Rick:") {
        ScriptLine {
            index,
            speaker: Speaker::Primary,
            text: rest.trim_start(),
        }
    } else if let Some(rest) = line.strip_prefix("Morty:") {
        ScriptLine {
            index,
            speaker: Speaker::Secondary,
            text: rest.trim_start(),
        }
    } else {
        ScriptLine {
            index,
            speaker: if index % 2 == 0 {
                Speaker::Primary
            } else {
                Speaker::Secondary
            },
            text: line,
        }
    }
}

pub fn plan_script(dialogue: &str) -> Vec<ScriptLine<'_>> {
    script_lines(dialogue)
        .into_iter()
        .enumerate()
        .map(|(i, line)| assign_speaker(i, line))
        .collect()
}

fn is_us_english(lang: &str) -> bool {
    let lang = lang.to_lowercase();
    lang.contains("en-us") || lang.contains("enus")
}

fn is_english(lang: &str) -> bool {
    lang.to_lowercase().contains("en")
}

/// Pick `(primary, secondary)` indices into `voices`.
///
/// Secondary equals primary only when there is no other voice.
pub fn pick_voices(voices: &[Voice]) -> Option<(usize, usize)> {
    if voices.is_empty() {
        return None;
    }

    let primary = voices
        .iter()
        .position(|v| is_us_english(&v.lang))
        .or_else(|| voices.iter().position(|v| is_english(&v.lang)))
        .unwrap_or(0);

    let others = || voices.iter().enumerate().filter(move |(i, _)| *i != primary);
    let secondary = others()
        .find(|(_, v)| is_english(&v.lang))
        .or_else(|| others().next())
        .map_or(primary, |(i, _)| i);

    Some((primary, secondary))
}

/// Narration state for the open detail view.
pub struct Narrator {
    engine: Option<Box<dyn SpeechEngine>>,
    muted: bool,
    spoken_index: Option<usize>,
    script: u64,
}

impl Narrator {
    pub fn new(engine: Box<dyn SpeechEngine>) -> Self {
        Self {
            engine: Some(engine),
            muted: false,
            spoken_index: None,
            script: 0,
        }
    }

    /// A narrator for environments without speech support. Every operation
    /// is a no-op.
    pub fn unsupported() -> Self {
        Self {
            engine: None,
            muted: false,
            spoken_index: None,
            script: 0,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.engine.is_some()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn spoken_index(&self) -> Option<usize> {
        self.spoken_index
    }

    /// Narrate `dialogue` from the first line, replacing any current script.
    /// Returns the number of utterances queued.
    pub fn speak(&mut self, dialogue: &str) -> usize {
        let Some(engine) = self.engine.as_mut() else {
            return 0;
        };
        if dialogue.trim().is_empty() {
            return 0;
        }

        engine.cancel();
        self.spoken_index = None;
        self.script += 1;

        let voices = engine.voices();
        let Some((primary, secondary)) = pick_voices(&voices) else {
            debug!("No voices available, skipping narration");
            return 0;
        };

        let lines = plan_script(dialogue);
        for line in &lines {
            let voice = match line.speaker {
                Speaker::Primary => &voices[primary],
                Speaker::Secondary => &voices[secondary],
            };
            engine.speak(Utterance {
                script: self.script,
                index: line.index,
                text: line.text.to_string(),
                voice: voice.clone(),
            });
        }

        info!(
            "Narrating {} lines (primary: {}, secondary: {})",
            lines.len(),
            voices[primary].name,
            voices[secondary].name
        );
        lines.len()
    }

    /// Cancel narration and clear the spoken line.
    pub fn stop(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        engine.cancel();
        self.script += 1;
        self.spoken_index = None;
    }

    /// Flip the global mute. Unmuting replays `loaded_dialogue` from the top.
    /// Returns the new mute state.
    pub fn toggle_mute(&mut self, loaded_dialogue: Option<&str>) -> bool {
        if self.engine.is_none() {
            return self.muted;
        }

        self.muted = !self.muted;
        if self.muted {
            info!("Narration muted");
            self.stop();
        } else {
            info!("Narration unmuted");
            if let Some(dialogue) = loaded_dialogue {
                self.speak(dialogue);
            }
        }
        self.muted
    }

    /// Stop narration and unmute, as when the detail view changes.
    pub fn reset(&mut self) {
        self.stop();
        self.muted = false;
        self.spoken_index = None;
    }

    /// Track the line being spoken. Returns true when a line of the current
    /// script started.
    pub fn handle_event(&mut self, event: SpeechEvent) -> bool {
        if self.engine.is_none() {
            return false;
        }
        match event {
            SpeechEvent::Started { script, index } if script == self.script => {
                self.spoken_index = Some(index);
                true
            }
            SpeechEvent::Ended { script, index } if script == self.script => {
                if self.spoken_index == Some(index) {
                    self.spoken_index = None;
                }
                false
            }
            _ => {
                debug!("Ignoring speech event from superseded script: {event:?}");
                false
            }
        }
    }
}
