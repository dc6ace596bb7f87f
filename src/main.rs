use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use quorum::config::Config;
use quorum::doctor;
use quorum::filters::{AnswerFilter, QuestionFilter, TagFilter, UserFilter};
use quorum::models::{Provider, TargetType};
use quorum::utils::ensure_database_directory;
use quorum::validation::{
    CreateAnswerParams, CreateQuestionParams, CreateUserParams, CreateVoteParams,
    EditQuestionParams, GetAnswersParams, GetQuestionsParams, GetTagQuestionsParams,
    GetTagsParams, GetUsersParams, OAuthProfile, Pagination, SignInWithOAuthParams,
};
use quorum::{
    ActionError, ActionResponse, ActionResult, Database, ForumService, QuestionId, TagId, UserId,
    VoteTarget, VoteType, logging,
};

/// quorum - a question and answer forum on SQLite
#[derive(Parser)]
#[command(name = "quorum")]
#[command(about = "A question and answer forum backed by SQLite")]
#[command(version)]
struct Cli {
    /// Database file (overrides QUORUM_DATABASE_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Act as this user for commands that write
    #[arg(long = "as", global = true, value_name = "USER_ID", env = "QUORUM_USER_ID")]
    caller: Option<UserId>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Manage users
    #[command(subcommand)]
    User(UserCommand),
    /// Sign in through an OAuth provider, creating the user if needed
    SignIn(SignInCommand),
    /// Ask a new question
    Ask(AskCommand),
    /// Edit one of your questions
    Edit(EditCommand),
    /// Show a question
    Show { id: QuestionId },
    /// Record a view of a question
    View { id: QuestionId },
    /// List questions
    Questions(QuestionsCommand),
    /// Answer a question
    Answer(AnswerCommand),
    /// List a question's answers
    Answers(AnswersCommand),
    /// Toggle a vote on a question or answer
    Vote(VoteCommand),
    /// Show whether you voted on a question or answer
    Voted(TargetArgs),
    /// List tags
    Tags(TagsCommand),
    /// List the questions carrying a tag
    Tag(TagCommand),
    /// Check database health and counter consistency
    Doctor {
        /// Rewrite counters that disagree with the underlying rows
        #[arg(long)]
        repair: bool,
    },
}

#[derive(Subcommand)]
enum UserCommand {
    /// Register a user
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        image: Option<String>,
    },
    /// List users
    List {
        #[command(flatten)]
        page: PageArgs,
        /// Matched against name and username
        #[arg(short, long)]
        query: Option<String>,
        #[arg(short, long, default_value_t = UserFilter::default())]
        filter: UserFilter,
    },
    /// Show a user by id or email
    Show {
        #[arg(required_unless_present = "email")]
        id: Option<UserId>,
        #[arg(long, conflicts_with = "id")]
        email: Option<String>,
    },
}

#[derive(Args)]
struct SignInCommand {
    #[arg(long, default_value = "github")]
    provider: Provider,
    #[arg(long = "account-id")]
    provider_account_id: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    image: Option<String>,
}

#[derive(Args)]
struct AskCommand {
    #[arg(long)]
    title: String,
    #[arg(long)]
    content: String,
    /// Comma-separated tags
    #[arg(short, long, value_name = "TAGS")]
    tags: String,
}

#[derive(Args)]
struct EditCommand {
    id: QuestionId,
    #[arg(long)]
    title: String,
    #[arg(long)]
    content: String,
    /// Comma-separated tags; replaces the current list
    #[arg(short, long, value_name = "TAGS")]
    tags: String,
}

#[derive(Args)]
struct PageArgs {
    #[arg(long, default_value_t = 1)]
    page: i64,
    /// Defaults to QUORUM_PAGE_SIZE
    #[arg(long)]
    page_size: Option<i64>,
}

#[derive(Args)]
struct QuestionsCommand {
    #[command(flatten)]
    page: PageArgs,
    #[arg(short, long)]
    query: Option<String>,
    #[arg(short, long, default_value_t = QuestionFilter::default())]
    filter: QuestionFilter,
}

#[derive(Args)]
struct AnswerCommand {
    question_id: QuestionId,
    #[arg(long)]
    content: String,
}

#[derive(Args)]
struct AnswersCommand {
    question_id: QuestionId,
    #[command(flatten)]
    page: PageArgs,
    #[arg(short, long, default_value_t = AnswerFilter::default())]
    filter: AnswerFilter,
}

#[derive(Args)]
struct TargetArgs {
    /// question or answer
    kind: TargetType,
    id: i64,
}

impl TargetArgs {
    fn target(&self) -> VoteTarget {
        VoteTarget::from_parts(self.kind, self.id)
    }
}

#[derive(Args)]
struct VoteCommand {
    #[command(flatten)]
    target: TargetArgs,
    /// up or down
    vote_type: VoteType,
}

#[derive(Args)]
struct TagsCommand {
    #[command(flatten)]
    page: PageArgs,
    #[arg(short, long)]
    query: Option<String>,
    #[arg(short, long, default_value_t = TagFilter::default())]
    filter: TagFilter,
}

#[derive(Args)]
struct TagCommand {
    id: TagId,
    #[command(flatten)]
    page: PageArgs,
    #[arg(short, long)]
    query: Option<String>,
}

/// JSON text to print and the process exit code that goes with it.
struct Rendered {
    json: String,
    exit_code: u8,
}

fn main() -> ExitCode {
    logging::init_logging();
    let cli = Cli::parse();

    let rendered = match open_service(&cli) {
        Ok((service, config)) => execute(&cli.command, cli.caller, &service, &config),
        Err(e) => render::<()>(Err(ActionError::Internal(e))),
    };

    println!("{}", rendered.json);
    ExitCode::from(rendered.exit_code)
}

/// Resolves configuration and opens the database it points at.
fn open_service(cli: &Cli) -> Result<(ForumService, Config)> {
    let mut builder = Config::builder();
    if let Some(path) = &cli.db {
        builder = builder.database_path(path);
    }
    let config = builder.load()?;

    ensure_database_directory(&config.database_path)?;
    let db = Database::open(&config.database_path).with_context(|| {
        format!("Failed to open database: {}", config.database_path.display())
    })?;
    db.set_busy_timeout(config.busy_timeout)?;

    Ok((ForumService::new(db), config))
}

/// Folds a result into the response envelope.
///
/// Exit code is 0 on success, 1 for client errors and 2 for internal ones.
fn render<T: Serialize>(result: ActionResult<T>) -> Rendered {
    let exit_code = match &result {
        Ok(_) => 0,
        Err(e) if e.is_client_error() => 1,
        Err(_) => 2,
    };

    match serde_json::to_string_pretty(&ActionResponse::from(result)) {
        Ok(json) => Rendered { json, exit_code },
        Err(e) => Rendered {
            json: json!({ "success": false, "errors": { "message": e.to_string() }, "status": 500 })
                .to_string(),
            exit_code: 2,
        },
    }
}

fn pagination(args: &PageArgs, config: &Config) -> Pagination {
    Pagination::new(args.page, args.page_size.unwrap_or(config.page_size))
}

/// Runs one command against the service.
///
/// Separated from `main` so tests can drive it with an in-memory database.
fn execute(command: &Commands, caller: Option<UserId>, service: &ForumService, config: &Config) -> Rendered {
    match command {
        Commands::User(UserCommand::Add {
            name,
            username,
            email,
            image,
        }) => render(service.create_user(CreateUserParams {
            name: name.clone(),
            username: username.clone(),
            email: email.clone(),
            image: image.clone(),
        })),
        Commands::User(UserCommand::List {
            page,
            query,
            filter,
        }) => render(service.get_users(GetUsersParams {
            pagination: pagination(page, config),
            query: query.clone(),
            filter: *filter,
        })),
        Commands::User(UserCommand::Show { id, email }) => match (id, email) {
            (Some(id), _) => render(service.get_user(*id)),
            (None, Some(email)) => render(service.get_user_by_email(email)),
            (None, None) => render::<()>(Err(ActionError::invalid_field("id", "Required"))),
        },
        Commands::SignIn(cmd) => render(service.sign_in_with_oauth(SignInWithOAuthParams {
            provider: cmd.provider,
            provider_account_id: cmd.provider_account_id.clone(),
            user: OAuthProfile {
                name: cmd.name.clone(),
                username: cmd.username.clone(),
                email: cmd.email.clone(),
                image: cmd.image.clone(),
            },
        })),
        Commands::Ask(cmd) => render(service.create_question(
            caller,
            CreateQuestionParams {
                title: cmd.title.clone(),
                content: cmd.content.clone(),
                tags: parse_tags(&cmd.tags),
            },
        )),
        Commands::Edit(cmd) => render(service.edit_question(
            caller,
            EditQuestionParams {
                question_id: cmd.id,
                title: cmd.title.clone(),
                content: cmd.content.clone(),
                tags: parse_tags(&cmd.tags),
            },
        )),
        Commands::Show { id } => render(service.get_question(*id)),
        Commands::View { id } => render(service.increment_views(*id).map(|views| json!({ "views": views }))),
        Commands::Questions(cmd) => render(service.get_questions(GetQuestionsParams {
            pagination: pagination(&cmd.page, config),
            query: cmd.query.clone(),
            filter: cmd.filter,
        })),
        Commands::Answer(cmd) => render(service.create_answer(
            caller,
            CreateAnswerParams {
                question_id: cmd.question_id,
                content: cmd.content.clone(),
            },
        )),
        Commands::Answers(cmd) => render(service.get_answers(GetAnswersParams {
            question_id: cmd.question_id,
            pagination: pagination(&cmd.page, config),
            filter: cmd.filter,
        })),
        Commands::Vote(cmd) => render(service.create_vote(
            caller,
            CreateVoteParams {
                target: cmd.target.target(),
                vote_type: cmd.vote_type,
            },
        )),
        Commands::Voted(target) => render(service.has_voted(caller, target.target())),
        Commands::Tags(cmd) => render(service.get_tags(GetTagsParams {
            pagination: pagination(&cmd.page, config),
            query: cmd.query.clone(),
            filter: cmd.filter,
        })),
        Commands::Tag(cmd) => render(service.get_tag_questions(GetTagQuestionsParams {
            tag_id: cmd.id,
            pagination: pagination(&cmd.page, config),
            query: cmd.query.clone(),
        })),
        Commands::Doctor { repair } => {
            let path = config.database_path.display().to_string();
            render(doctor::run_doctor(&path, service, *repair).map_err(ActionError::from))
        }
    }
}

/// Parses comma-separated tags from a string.
///
/// Splits on commas, trims whitespace from each tag, and filters out empty strings.
fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
