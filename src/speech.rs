//! Speech engines that narrate queued utterances on a background task.
//!
//! Two synthesizers are supported:
//! - `Command`: an espeak-ng compatible CLI (`<cmd> -v <voice> -s <wpm> -- <text>`)
//! - `Console`: logs each line and waits roughly as long as speaking it would take
//!
//! If no synthesizer is usable the explorer runs with an unsupported
//! narrator and stays silent.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{SpeechBackend, SpeechConfig};
use crate::narrator::{SpeechEngine, SpeechEvent, Utterance, Voice};

#[derive(Debug, Clone)]
enum Synthesizer {
    Command { program: String, words_per_minute: u32 },
    Console { words_per_minute: u32 },
}

struct Job {
    utterance: Utterance,
    cancel: CancellationToken,
}

/// Engine that speaks utterances strictly in submission order.
///
/// Cancellation swaps in a fresh token, so jobs queued before the cancel are
/// skipped by the worker while later ones play normally.
pub struct QueuedSpeechEngine {
    voices: Vec<Voice>,
    jobs: mpsc::UnboundedSender<Job>,
    cancel: CancellationToken,
}

impl QueuedSpeechEngine {
    fn spawn(
        synthesizer: Synthesizer,
        voices: Vec<Voice>,
        events: mpsc::UnboundedSender<SpeechEvent>,
    ) -> Self {
        let (jobs, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(synthesizer, rx, events));

        Self {
            voices,
            jobs,
            cancel: CancellationToken::new(),
        }
    }

    /// Engine driving an espeak-ng compatible command.
    pub fn command(
        program: &str,
        words_per_minute: u32,
        voices: Vec<Voice>,
        events: mpsc::UnboundedSender<SpeechEvent>,
    ) -> Self {
        Self::spawn(
            Synthesizer::Command {
                program: program.to_string(),
                words_per_minute,
            },
            voices,
            events,
        )
    }

    /// Engine that prints lines instead of speaking them.
    pub fn console(
        words_per_minute: u32,
        voices: Vec<Voice>,
        events: mpsc::UnboundedSender<SpeechEvent>,
    ) -> Self {
        Self::spawn(Synthesizer::Console { words_per_minute }, voices, events)
    }
}

impl SpeechEngine for QueuedSpeechEngine {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, utterance: Utterance) {
        let job = Job {
            utterance,
            cancel: self.cancel.clone(),
        };
        if self.jobs.send(job).is_err() {
            warn!("Speech worker has stopped, dropping utterance");
        }
    }

    fn cancel(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
    }
}

async fn run_worker(
    synthesizer: Synthesizer,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    events: mpsc::UnboundedSender<SpeechEvent>,
) {
    while let Some(job) = jobs.recv().await {
        if job.cancel.is_cancelled() {
            continue;
        }

        let Utterance {
            script,
            index,
            ref text,
            ref voice,
        } = job.utterance;

        if events.send(SpeechEvent::Started { script, index }).is_err() {
            break;
        }

        let interrupted = match &synthesizer {
            Synthesizer::Command {
                program,
                words_per_minute,
            } => speak_with_command(program, *words_per_minute, voice, text, &job.cancel).await,
            Synthesizer::Console { words_per_minute } => {
                info!("🔊 [{}] {text}", voice.name);
                tokio::select! {
                    _ = tokio::time::sleep(speaking_time(text, *words_per_minute)) => false,
                    _ = job.cancel.cancelled() => true,
                }
            }
        };
        if interrupted {
            debug!("Utterance {index} of script {script} interrupted");
        }

        if events.send(SpeechEvent::Ended { script, index }).is_err() {
            break;
        }
    }
    debug!("Speech worker exiting");
}

/// Run the synthesizer command for one line. Returns true if cancelled.
async fn speak_with_command(
    program: &str,
    words_per_minute: u32,
    voice: &Voice,
    text: &str,
    cancel: &CancellationToken,
) -> bool {
    let mut child = match Command::new(program)
        .args(command_args(voice, words_per_minute, text))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            warn!("Failed to run {program}: {e}");
            return false;
        }
    };

    tokio::select! {
        status = child.wait() => {
            match status {
                Ok(s) if !s.success() => warn!("{program} exited with {s}"),
                Err(e) => warn!("Failed to wait for {program}: {e}"),
                _ => {}
            }
            false
        }
        _ = cancel.cancelled() => {
            if let Err(e) = child.kill().await {
                debug!("Failed to kill {program}: {e}");
            }
            true
        }
    }
}

/// Arguments for one synthesizer run. The text goes after `--` so lines
/// starting with a dash are not read as options.
fn command_args(voice: &Voice, words_per_minute: u32, text: &str) -> Vec<String> {
    vec![
        "-v".into(),
        voice.id.clone(),
        "-s".into(),
        words_per_minute.to_string(),
        "--".into(),
        text.into(),
    ]
}

/// Rough time it takes to say `text` at `words_per_minute`.
pub fn speaking_time(text: &str, words_per_minute: u32) -> Duration {
    let words = text.split_whitespace().count().max(1) as u64;
    let wpm = u64::from(words_per_minute.max(1));
    Duration::from_millis(words * 60_000 / wpm)
}

/// Parse `espeak-ng --voices` output.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  en-us           --/M      English_(America)  gmw/en-US            (en 10)
/// ```
pub fn parse_voice_list(output: &str) -> Vec<Voice> {
    output
        .lines()
        .filter(|line| !line.trim_start().starts_with("Pty"))
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 4 {
                return None;
            }
            Some(Voice {
                id: cols[1].to_string(),
                name: cols[3].replace('_', " "),
                lang: cols[1].to_string(),
            })
        })
        .collect()
}

async fn discover_voices(program: &str) -> Vec<Voice> {
    match Command::new(program).arg("--voices").output().await {
        Ok(output) if output.status.success() => {
            parse_voice_list(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            warn!("{program} --voices exited with {}", output.status);
            Vec::new()
        }
        Err(e) => {
            debug!("Speech command {program} unavailable: {e}");
            Vec::new()
        }
    }
}

fn console_voices() -> Vec<Voice> {
    vec![
        Voice::new("console-us", "Narrator (US)", "en-US"),
        Voice::new("console-gb", "Narrator (GB)", "en-GB"),
    ]
}

/// Build the configured engine, or `None` when speech is unavailable.
pub async fn build_engine(
    config: &SpeechConfig,
    events: mpsc::UnboundedSender<SpeechEvent>,
) -> Option<Box<dyn SpeechEngine>> {
    let configured: Vec<Voice> = config
        .voices
        .iter()
        .map(|v| Voice {
            id: v.id.clone(),
            name: if v.name.is_empty() { v.id.clone() } else { v.name.clone() },
            lang: v.lang.clone(),
        })
        .collect();

    match config.engine {
        SpeechBackend::None => {
            info!("Speech disabled");
            None
        }
        SpeechBackend::Console => {
            let voices = if configured.is_empty() { console_voices() } else { configured };
            info!("Console narration with {} voices", voices.len());
            Some(Box::new(QueuedSpeechEngine::console(
                config.words_per_minute,
                voices,
                events,
            )))
        }
        SpeechBackend::Command => {
            let voices = if configured.is_empty() {
                discover_voices(&config.command).await
            } else {
                configured
            };
            if voices.is_empty() {
                info!("No voices from {}, narration unavailable", config.command);
                return None;
            }
            info!("Narrating with {} ({} voices)", config.command, voices.len());
            Some(Box::new(QueuedSpeechEngine::command(
                &config.command,
                config.words_per_minute,
                voices,
                events,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utterance(script: u64, index: usize, text: &str) -> Utterance {
        Utterance {
            script,
            index,
            text: text.into(),
            voice: Voice::new("console-us", "Narrator (US)", "en-US"),
        }
    }

    #[test]
    fn parses_espeak_voice_table() {
        let output = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 2  en-gb           --/M      English_(Great_Britain) gmw/en            (en 2)
 5  en-us           --/M      English_(America)  gmw/en-US            (en 10)
";
        let voices = parse_voice_list(output);
        assert_eq!(voices.len(), 3);
        assert_eq!(voices[2], Voice::new("en-us", "English (America)", "en-us"));
    }

    #[test]
    fn dashed_text_follows_option_terminator() {
        let voice = Voice::new("en-us", "English (America)", "en-us");
        assert_eq!(
            command_args(&voice, 175, "-burp- Morty, get in"),
            ["-v", "en-us", "-s", "175", "--", "-burp- Morty, get in"]
        );
    }

    #[test]
    fn speaking_time_scales_with_words() {
        assert_eq!(speaking_time("one two three", 180), Duration::from_millis(1000));
        assert_eq!(speaking_time("", 120), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn console_engine_reports_lines_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = QueuedSpeechEngine::console(600, console_voices(), tx);

        engine.speak(utterance(1, 0, "Wubba lubba dub dub"));
        engine.speak(utterance(1, 1, "Aw geez Rick"));

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(rx.recv().await.unwrap());
        }
        assert_eq!(
            seen,
            vec![
                SpeechEvent::Started { script: 1, index: 0 },
                SpeechEvent::Ended { script: 1, index: 0 },
                SpeechEvent::Started { script: 1, index: 1 },
                SpeechEvent::Ended { script: 1, index: 1 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_and_drops_queue() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = QueuedSpeechEngine::console(60, console_voices(), tx);

        engine.speak(utterance(1, 0, "a long line that takes a while to say"));
        engine.speak(utterance(1, 1, "never spoken"));
        assert_eq!(rx.recv().await, Some(SpeechEvent::Started { script: 1, index: 0 }));

        engine.cancel();
        assert_eq!(rx.recv().await, Some(SpeechEvent::Ended { script: 1, index: 0 }));

        engine.speak(utterance(2, 0, "fresh start"));
        assert_eq!(rx.recv().await, Some(SpeechEvent::Started { script: 2, index: 0 }));
    }

    #[tokio::test]
    async fn missing_command_means_no_engine() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let config = SpeechConfig {
            command: "definitely-not-a-speech-synthesizer".into(),
            ..SpeechConfig::default()
        };
        assert!(build_engine(&config, tx).await.is_none());
    }
}
