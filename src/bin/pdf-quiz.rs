use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use pdf_quiz::clients::{ClientType, FlexibleClient};
use pdf_quiz::interceptors::FileInterceptor;
use pdf_quiz::session::{ExamTimer, Session, SessionMode};
use pdf_quiz::error::SessionError;
use pdf_quiz::store::{JsonFileStore, QuizStore};
use pdf_quiz::{ExtractionConfig, ExtractionError, ExtractionRequest, ExtractionResolver, QuizDocument, ScoreReport, TaskKind};

#[derive(Parser)]
#[command(author, version, about = "Turn quiz and exam PDFs into playable, scored question sets", long_about = None)]
#[command(after_help = "ENVIRONMENT VARIABLES:
    PDF_QUIZ_CLIENT    Provider to use (gemini|claude|mock) [default: first with a key]
    GEMINI_API_KEY     API key for the Gemini client
    ANTHROPIC_API_KEY  API key for the Claude client
    RUST_LOG           Log filter, e.g. pdf_quiz=debug

EXAMPLES:
    pdf-quiz extract --kind quiz biology.pdf --save quizzes.json
    pdf-quiz extract --kind exam exam.pdf --answer-key key.pdf --title \"Midterm\"
    pdf-quiz saved list quizzes.json
    pdf-quiz play quizzes.json \"Midterm\" --exam")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract questions or an answer key from a document
    Extract(ExtractArgs),
    /// Manage the saved collection
    Saved {
        #[command(subcommand)]
        action: SavedAction,
    },
    /// Take a saved quiz in the terminal
    Play(PlayArgs),
}

#[derive(Args)]
struct ExtractArgs {
    /// What to extract: answer-key, exam, quiz
    #[arg(short, long, default_value = "quiz")]
    kind: TaskKind,

    /// The PDF to read
    pdf: PathBuf,

    /// Answer key PDF to merge into an exam
    #[arg(long)]
    answer_key: Option<PathBuf>,

    /// Title of the resulting document [default: file name]
    #[arg(long)]
    title: Option<String>,

    /// Save the document into this collection file
    #[arg(long)]
    save: Option<PathBuf>,

    /// Provider: gemini, claude, mock [default: auto-detect]
    #[arg(short, long)]
    client: Option<ClientType>,

    /// Provider model id
    #[arg(short, long)]
    model: Option<String>,

    /// Give up on the model call after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Write prompts and raw responses of failed extractions here
    #[arg(long)]
    diagnostics: Option<PathBuf>,

    /// Do not append the output JSON Schema to the prompt
    #[arg(long)]
    no_schema: bool,
}

#[derive(Subcommand)]
enum SavedAction {
    /// List saved titles
    List { store: PathBuf },
    /// Print one saved document as JSON
    Show { store: PathBuf, title: String },
    /// Remove one saved document
    Delete { store: PathBuf, title: String },
}

#[derive(Args)]
struct PlayArgs {
    store: PathBuf,
    title: String,

    /// Timed exam instead of an untimed quiz
    #[arg(long)]
    exam: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("pdf_quiz=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match cli.command {
        Command::Extract(args) => extract(args).await,
        Command::Saved { action } => saved(action).await,
        Command::Play(args) => play(args).await,
    }
}

async fn read_document(path: &Path) -> Result<ExtractionRequest> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    ExtractionRequest::pdf(bytes).with_context(|| format!("loading {}", path.display()))
}

/// Log the failure with its raw text and turn it into the user-facing message.
fn report_failure(e: ExtractionError) -> anyhow::Error {
    error!(error = %e, "Extraction failed");
    if let Some(raw) = e.raw_response() {
        debug!(raw = %raw, "Raw model response");
    }
    anyhow::anyhow!(e.user_message())
}

async fn extract(args: ExtractArgs) -> Result<()> {
    let document = read_document(&args.pdf).await?;

    let client_type = match args.client {
        Some(client_type) => client_type,
        None => ClientType::from_env()?,
    };
    let client = FlexibleClient::from_type(client_type, args.model.as_deref(), args.timeout_secs.map(Duration::from_secs))?;

    let config = ExtractionConfig::default().with_schema_guidance(!args.no_schema);
    let mut resolver = ExtractionResolver::new(client, config);
    if let Some(dir) = &args.diagnostics {
        resolver = resolver.with_interceptor(Arc::new(FileInterceptor::new(dir)));
    }

    let title = args.title.clone().unwrap_or_else(|| {
        args.pdf
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string())
    });

    let quiz = match args.kind {
        TaskKind::AnswerKey => {
            if args.answer_key.is_some() || args.save.is_some() {
                warn!("--answer-key and --save apply to exam and quiz extraction only");
            }
            let key = resolver.extract_answer_key(&document).await.map_err(report_failure)?;
            println!("{}", serde_json::to_string_pretty(&key)?);
            return Ok(());
        }
        TaskKind::ExamQuestions => {
            let questions = resolver.extract_exam_questions(&document).await.map_err(report_failure)?;
            let answers = match &args.answer_key {
                Some(path) => {
                    let key_document = read_document(path).await?;
                    resolver.extract_answer_key(&key_document).await.map_err(report_failure)?.answers
                }
                None => Vec::new(),
            };
            QuizDocument::from_questions(title, questions.questions, &answers)
        }
        TaskKind::QuizQuestions => {
            let extraction = resolver.extract_quiz_questions(&document).await.map_err(report_failure)?;
            QuizDocument::from_quiz(title, extraction)
        }
    };

    info!(title = %quiz.title, questions = quiz.questions.len(), answered = quiz.answered_count(), "Document assembled");

    if let Some(path) = &args.save {
        let store = JsonFileStore::new(path);
        let replaced = store.put(quiz.clone()).await?;
        eprintln!(
            "{} \"{}\" in {}",
            if replaced { "Replaced" } else { "Saved" },
            quiz.title,
            path.display()
        );
    }

    println!("{}", serde_json::to_string_pretty(&quiz)?);
    Ok(())
}

async fn saved(action: SavedAction) -> Result<()> {
    match action {
        SavedAction::List { store } => {
            let documents = JsonFileStore::new(store).list().await?;
            if documents.is_empty() {
                println!("No saved quizzes.");
            }
            for doc in documents {
                println!("{}  ({} questions, {} with answers)", doc.title, doc.questions.len(), doc.answered_count());
            }
        }
        SavedAction::Show { store, title } => match JsonFileStore::new(store).get(&title).await? {
            Some(doc) => println!("{}", serde_json::to_string_pretty(&doc)?),
            None => bail!("no saved quiz titled \"{}\"", title),
        },
        SavedAction::Delete { store, title } => {
            if !JsonFileStore::new(store).delete(&title).await? {
                bail!("no saved quiz titled \"{}\"", title);
            }
            println!("Deleted \"{}\"", title);
        }
    }
    Ok(())
}

async fn play(args: PlayArgs) -> Result<()> {
    let store = JsonFileStore::new(&args.store);
    let Some(document) = store.get(&args.title).await? else {
        bail!("no saved quiz titled \"{}\"", args.title);
    };
    if document.answered_count() == 0 {
        warn!("this document has no answer key; every answer will be scored as wrong");
    }

    let mut session = Session::new();
    session.load(document.clone())?;
    let mode = if args.exam { SessionMode::Exam } else { SessionMode::Quiz };
    session.start(mode, Utc::now())?;

    println!("{}\n", document.title);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    for question in &document.questions {
        if session.tick(Utc::now()).is_some() {
            println!("\nTime is up.");
            break;
        }
        if let Some(timer) = session.timer() {
            println!("[{} left]", ExamTimer::format_hms(timer.remaining(Utc::now())));
        }

        println!("{}. {}", question.question_number, question.question_text);
        for (i, option) in question.options.iter().enumerate() {
            println!("   {}: {}", i + 1, option);
        }
        print_prompt("Answer (number, letter or text, blank to skip): ");

        let Some(line) = lines.next_line().await? else { break };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let chosen = input
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| question.options.get(i))
            .map_or(input, String::as_str);
        match session.answer(question.question_number, chosen, Utc::now()) {
            Ok(()) => println!(),
            Err(SessionError::TimeExpired) => {
                println!("\nTime is up. That answer was not recorded.");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let report = match session.report() {
        Some(report) => report.clone(),
        None => session.submit()?.clone(),
    };
    print_report(&report);
    Ok(())
}

fn print_prompt(text: &str) {
    use std::io::Write;
    print!("{}", text);
    let _ = std::io::stdout().flush();
}

fn print_report(report: &ScoreReport) {
    println!("\nScore: {}/{} ({}%)", report.correct, report.total, report.percentage);
    for outcome in report.incorrect() {
        println!(
            "  {}. your answer: {}, correct: {}",
            outcome.question_number,
            outcome.user_answer.as_deref().unwrap_or("(none)"),
            if outcome.correct_answer.is_empty() { "(no key)" } else { outcome.correct_answer.as_str() }
        );
    }
}
