//! voicetask CLI
//!
//! 音声（またはテキスト）でタスクを追加・編集・完了する。
//! `--offline` では LLM を呼ばず、resolver はすべて fallback に落ちる。

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use voicetask_core::domain::{Result as CoreResult, TaskerError};
use voicetask_core::impls::{
    JsonFileRepository, OpenAiGenerator, OpenAiTranscriber, ScriptedGenerator,
};
use voicetask_core::ports::{AudioClip, StructuredGenerator, Transcriber};
use voicetask_core::{ProcessedCommand, Task, TaskId, TaskerConfig, VoiceTasker, VoiceTaskerBuilder};

/// Voice-driven to-do list.
#[derive(Parser)]
#[command(name = "voicetask", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not call the language model; every command falls back to defaults.
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a task directly.
    Add {
        text: String,
        /// Due time, RFC 3339 (e.g. 2024-08-02T17:00:00+09:00).
        #[arg(long)]
        due: Option<DateTime<chrono::FixedOffset>>,
        /// Human-readable due time shown in notifications.
        #[arg(long, requires = "due")]
        description: Option<String>,
    },

    /// List all tasks.
    List,

    /// Flip a task between open and completed.
    Toggle { id: TaskId },

    /// Delete a task.
    Remove { id: TaskId },

    /// Create a task, or update a matching one, from a spoken or typed command.
    Say {
        #[command(flatten)]
        input: CommandInput,
        /// Apply the proposal without asking.
        #[arg(short, long)]
        yes: bool,
        /// Print the raw result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Edit one task from a spoken or typed command.
    Edit {
        id: TaskId,
        #[command(flatten)]
        input: CommandInput,
        #[arg(short, long)]
        yes: bool,
    },

    /// Mark the task a command refers to as completed.
    Done {
        #[command(flatten)]
        input: CommandInput,
    },

    /// Ask which open task to do next.
    Suggest,

    /// Stay running so reminders and due alerts fire. Ctrl+C to stop.
    Watch,

    /// Write the effective configuration to the config file.
    InitConfig,
}

/// Either typed text or an audio file / data URI.
#[derive(Args)]
#[group(required = true, multiple = false)]
struct CommandInput {
    /// Command as text.
    text: Option<String>,
    /// Audio file (webm, ogg, wav, mp3, m4a) or `data:<mime>;base64,...` URI.
    #[arg(long)]
    audio: Option<String>,
}

impl CommandInput {
    fn audio_clip(&self) -> anyhow::Result<Option<AudioClip>> {
        let Some(audio) = &self.audio else {
            return Ok(None);
        };
        if audio.starts_with("data:") {
            return Ok(Some(AudioClip::from_data_uri(audio)?));
        }
        let path = Path::new(audio);
        let bytes =
            std::fs::read(path).with_context(|| format!("reading audio file {}", path.display()))?;
        Ok(Some(AudioClip::new(mime_for(path), bytes)))
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or_default() {
        "ogg" | "oga" => "audio/ogg",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" | "mp4" => "audio/mp4",
        "flac" => "audio/flac",
        _ => "audio/webm",
    }
}

/// Transcriber for `--offline`: there is no speech-to-text without the API.
struct OfflineTranscriber;

#[async_trait]
impl Transcriber for OfflineTranscriber {
    async fn transcribe(&self, _audio: &AudioClip) -> CoreResult<String> {
        Err(TaskerError::Transcription(
            "transcription is not available offline".into(),
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("voicetask=info,voicetask_core=info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(TaskerConfig::default_config_path);
    let config = TaskerConfig::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    if let Command::InitConfig = cli.command {
        config.save_to_file(&config_path)?;
        println!("Wrote {}", config_path.display());
        return Ok(());
    }

    let mut tasker = build_tasker(&config, cli.offline)?;
    run(&mut tasker, cli.command).await
}

fn build_tasker(config: &TaskerConfig, offline: bool) -> anyhow::Result<VoiceTasker> {
    let (generator, transcriber): (Arc<dyn StructuredGenerator>, Arc<dyn Transcriber>) =
        if offline {
            (Arc::new(ScriptedGenerator::new()), Arc::new(OfflineTranscriber))
        } else {
            let key = config.llm.api_key()?;
            (
                Arc::new(OpenAiGenerator::new(config.llm.generation_config(&key))),
                Arc::new(OpenAiTranscriber::new(config.llm.transcription_config(&key))),
            )
        };

    let tasks_path = config.storage.tasks_path();
    info!(path = %tasks_path.display(), offline, "starting voicetask");

    let tasker = VoiceTaskerBuilder::new()
        .generator(generator)
        .transcriber(transcriber)
        .repository(Arc::new(JsonFileRepository::new(tasks_path)))
        .generation_timeout(config.llm.timeout())
        .reminder_lead(config.notifications.reminder_lead())
        .build()?;
    Ok(tasker)
}

async fn run(tasker: &mut VoiceTasker, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Add {
            text,
            due,
            description,
        } => {
            let due = due.map(|d| d.with_timezone(&Utc));
            let task = tasker.store_mut().add(&text, due, description)?;
            println!("Added {}", render(&task));
        }
        Command::List => {
            if tasker.store().is_empty() {
                println!("No tasks yet.");
            }
            for task in tasker.store().tasks() {
                println!("{}", render(task));
            }
        }
        Command::Toggle { id } => {
            let task = tasker.store_mut().toggle(id)?;
            println!("{}", render(&task));
        }
        Command::Remove { id } => match tasker.store_mut().remove(id) {
            Some(task) => println!("Removed {}", render(&task)),
            None => println!("No task {id}."),
        },
        Command::Say { input, yes, json } => {
            let processed = match input.audio_clip()? {
                Some(clip) => tasker.process_voice_command(&clip).await,
                None => {
                    tasker
                        .process_text_command(input.text.as_deref().unwrap_or_default())
                        .await
                }
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&processed)?);
            }
            let (transcript, resolution) = match processed {
                ProcessedCommand::Interpreted {
                    transcript,
                    resolution,
                } => (transcript, resolution),
                ProcessedCommand::NotUnderstood { error } => bail!("{error}"),
            };
            let proposal = resolution.proposal();
            println!("Heard: \"{transcript}\"");
            if let Some(id) = proposal.matched_task_id {
                println!("Update {id} to: {}", proposal.text);
            } else {
                println!("New task: {}", proposal.text);
            }
            if let Some(due) = proposal.due_at {
                println!("  due {}", local(due));
            }
            println!("  ({})", proposal.reason);
            if yes || confirm("Apply?")? {
                let task = tasker.apply_proposal(proposal)?;
                println!("Saved {}", render(&task));
            }
        }
        Command::Edit { id, input, yes } => {
            let resolution = match input.audio_clip()? {
                Some(clip) => tasker.edit_by_voice(id, &clip).await?,
                None => {
                    tasker
                        .edit_by_text(id, input.text.as_deref().unwrap_or_default())
                        .await?
                }
            };
            let edit = resolution.edit();
            println!("{}", edit.change_summary);
            if edit.no_changes_made {
                return Ok(());
            }
            println!("  text: {}", edit.updated_text);
            match edit.new_due_at {
                Some(due) => println!("  due {}", local(due)),
                None => println!("  no due time"),
            }
            if yes || confirm("Apply?")? {
                let task = tasker.apply_edit(id, edit)?;
                println!("Saved {}", render(&task));
            }
        }
        Command::Done { input } => {
            let matched = match input.audio_clip()? {
                Some(clip) => tasker.complete_by_voice(&clip).await?,
                None => {
                    tasker
                        .complete_by_text(input.text.as_deref().unwrap_or_default())
                        .await?
                }
            };
            match matched.task_id.and_then(|id| tasker.store().get(id)) {
                Some(task) => println!("Completed {}", render(task)),
                None => println!("{}", matched.reason),
            }
        }
        Command::Suggest => {
            let suggestion = tasker.suggest_priority().await;
            if let Some(task) = &suggestion.suggested {
                println!("Next: {} ({})", task.text, task.id);
            }
            println!("{}", suggestion.reason);
        }
        Command::Watch => {
            println!(
                "Watching {} scheduled notification(s). Press Ctrl+C to stop.",
                tasker.store().scheduler().armed_count()
            );
            tokio::signal::ctrl_c().await?;
            info!("received Ctrl+C, shutting down...");
        }
        Command::InitConfig => bail!("init-config runs before the task list is loaded"),
    }
    Ok(())
}

fn render(task: &Task) -> String {
    let mark = if task.is_completed() { "x" } else { " " };
    let mut line = format!("[{mark}] {} {}", task.id(), task.text());
    if let Some(due) = task.due_at() {
        line.push_str(&format!(" (due {}", local(due)));
        if let Some(description) = task.time_description() {
            line.push_str(&format!(", {description}"));
        }
        line.push(')');
    }
    line
}

fn local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
