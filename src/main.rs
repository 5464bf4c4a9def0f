use std::io::Write;
use std::sync::Arc;

use chrono::Weekday;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trainlog::clock::{format_clock, SystemClock};
use trainlog::config::Config;
use trainlog::db;
use trainlog::error::{AppError, Result};
use trainlog::migrations::run_migrations;
use trainlog::models::template::{expand_rep_blocks, parse_custom_reps, rep_blocks_preview, RepBlock};
use trainlog::models::{
    ComboType, ExerciseDraft, NewUser, Prescription, RestStatus, SetInput, Unit, User, UserRole,
};
use trainlog::services::{GroupEdit, ItemGroup};
use trainlog::store::SqliteStore;
use trainlog::units::format_weight;
use trainlog::version::GIT_VERSION;
use trainlog::Trainlog;

type App = Trainlog<SqliteStore>;

#[derive(Parser, Debug)]
#[command(version = GIT_VERSION, about = "Trainlog - workout templates and live sessions")]
struct Cli {
    /// Acting user's email
    #[arg(short, long, global = true, env = "TRAINLOG_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        admin: bool,
    },
    #[command(flatten)]
    User(UserCommand),
}

/// Commands that act as the `--user` account.
#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Show or change the display unit (kg or lb)
    Unit { unit: Option<String> },
    /// Search the exercise catalog
    Exercises {
        #[arg(default_value = "")]
        query: String,
        /// Include inactive exercises (admin)
        #[arg(long)]
        all: bool,
    },
    /// Manage catalog entries (admin)
    #[command(subcommand)]
    Exercise(ExerciseCommand),
    /// Ask for an exercise to be added to the catalog
    #[command(subcommand)]
    Request(RequestCommand),
    #[command(subcommand)]
    Template(TemplateCommand),
    #[command(subcommand)]
    Day(DayCommand),
    #[command(subcommand)]
    Item(ItemCommand),
    #[command(subcommand)]
    Session(SessionCommand),
    #[command(subcommand)]
    Set(SetCommand),
    #[command(subcommand)]
    Rest(RestCommand),
    /// Finished sessions, newest first
    History {
        /// Delete a finished session and its sets
        #[arg(long)]
        delete: Option<String>,
    },
    /// Remove orphaned records and resync the live session
    Repair,
}

#[derive(Args, Debug, Clone)]
struct DraftArgs {
    #[arg(long, default_value = "")]
    name: String,
    #[arg(long, default_value = "")]
    primary: String,
    #[arg(long, value_delimiter = ',')]
    secondary: Vec<String>,
    #[arg(long, default_value = "")]
    equipment: String,
    #[arg(long = "type", default_value = "")]
    exercise_type: String,
    #[arg(long, default_value = "")]
    instructions: String,
    #[arg(long, default_value = "")]
    notes: String,
    #[arg(long)]
    video: Option<String>,
}

impl From<DraftArgs> for ExerciseDraft {
    fn from(args: DraftArgs) -> Self {
        ExerciseDraft {
            name: args.name,
            primary_muscle: args.primary,
            secondary_muscles: args.secondary,
            equipment: args.equipment,
            exercise_type: args.exercise_type,
            instructions: args.instructions,
            notes: args.notes,
            video_url: args.video,
        }
    }
}

#[derive(Subcommand, Debug)]
enum ExerciseCommand {
    Add(DraftArgs),
    Update {
        id: String,
        #[command(flatten)]
        draft: DraftArgs,
    },
    Enable { id: String },
    Disable { id: String },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum RequestCommand {
    Submit {
        name: String,
        #[arg(long, default_value = "")]
        details: String,
    },
    /// Your own requests
    List,
    /// Requests awaiting review (admin)
    Pending,
    Approve {
        id: String,
        #[command(flatten)]
        draft: DraftArgs,
    },
    Reject {
        id: String,
        #[arg(long, default_value = "")]
        note: String,
    },
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    Create {
        name: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    List,
    Delete { id: String },
    /// Every day with its grouped exercises
    Plan { id: String },
}

#[derive(Subcommand, Debug)]
enum DayCommand {
    Add {
        template_id: String,
        #[arg(long, value_parser = parse_weekday)]
        weekday: Weekday,
        #[arg(long, value_delimiter = ',', required = true)]
        groups: Vec<String>,
    },
    List { template_id: String },
    Delete { id: String },
    Order { id: String, order: i64 },
}

#[derive(Args, Debug, Clone)]
struct PrescriptionArgs {
    #[arg(long, default_value_t = 0)]
    sets: u32,
    #[arg(long, default_value = "")]
    reps: String,
    /// Per-set reps, e.g. "12,10,8"
    #[arg(long)]
    custom_reps: Option<String>,
    /// Rep blocks as SETSxREPS, e.g. "3x12" "1x10"
    #[arg(long, num_args = 1.., value_parser = parse_rep_block)]
    blocks: Vec<RepBlock>,
    #[arg(long, default_value_t = 0)]
    rest: u32,
}

impl PrescriptionArgs {
    fn into_prescription(self) -> Result<Prescription> {
        let custom_reps = if !self.blocks.is_empty() {
            println!("Reps: {}", rep_blocks_preview(&self.blocks));
            Some(expand_rep_blocks(&self.blocks))
        } else {
            parse_custom_reps(self.custom_reps.as_deref().unwrap_or(""))
                .map_err(AppError::Validation)?
        };

        let target_sets = match &custom_reps {
            Some(reps) if self.sets == 0 => reps.len() as u32,
            _ => self.sets,
        };

        Ok(Prescription {
            target_sets,
            target_reps: self.reps,
            custom_reps,
            rest_seconds: self.rest,
        }
        .normalized())
    }
}

#[derive(Subcommand, Debug)]
enum ItemCommand {
    /// Add one exercise, or several as a combo with --combo
    Add {
        day_id: String,
        #[arg(required = true)]
        exercise_ids: Vec<String>,
        /// superset, biset, triset, giantset or none
        #[arg(long, default_value = "")]
        combo: String,
        #[command(flatten)]
        prescription: PrescriptionArgs,
    },
    /// Append an exercise to the group starting at FIRST_ITEM_ID
    Extend {
        first_item_id: String,
        exercise_id: String,
    },
    /// Replace the prescription of a whole group
    Edit {
        first_item_id: String,
        /// New combo type; the current one is kept when omitted
        #[arg(long)]
        combo: Option<String>,
        #[command(flatten)]
        prescription: PrescriptionArgs,
    },
    Remove { first_item_id: String },
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    Start { template_id: String },
    Finish,
    Status,
}

#[derive(Subcommand, Debug)]
enum SetCommand {
    /// Log a set to the running session
    Log {
        exercise_id: String,
        /// In your display unit; a decimal comma is accepted
        weight: String,
        #[arg(long)]
        reps: Option<String>,
        #[arg(long)]
        rir: Option<u32>,
        #[arg(long)]
        rpe: Option<f64>,
        #[arg(long)]
        note: Option<String>,
        /// Rest countdown to start after logging; defaults to the template's
        /// prescribed rest for this exercise
        #[arg(long, conflicts_with = "no_rest")]
        rest: Option<u32>,
        /// Do not start a rest countdown
        #[arg(long)]
        no_rest: bool,
    },
    List,
}

#[derive(Subcommand, Debug)]
enum RestCommand {
    Start { seconds: Option<u32> },
    Stop,
    Status,
    /// Follow the countdown until it ends or Ctrl-C
    Watch,
}

fn parse_weekday(s: &str) -> std::result::Result<Weekday, String> {
    s.parse::<Weekday>()
        .map_err(|_| format!("invalid weekday: {}", s))
}

fn parse_rep_block(s: &str) -> std::result::Result<RepBlock, String> {
    let (sets, reps) = s
        .split_once(|c: char| c.eq_ignore_ascii_case(&'x'))
        .ok_or_else(|| format!("expected SETSxREPS, got {}", s))?;
    let sets = sets.trim().parse::<u32>().map_err(|e| e.to_string())?;
    let reps = reps.trim().parse::<u32>().map_err(|e| e.to_string())?;
    if sets == 0 || reps == 0 {
        return Err("sets and reps must be positive".to_string());
    }
    Ok(RepBlock { sets, reps })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trainlog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    tracing::debug!("Connecting to database: {}", config.database_url);

    let pool = db::create_pool(&config.database_url)?;
    run_migrations(&pool)?;

    let app = Trainlog::new(SqliteStore::new(pool), Arc::new(SystemClock));
    if let Err(e) = app.catalog.seed_if_empty().await {
        anyhow::bail!(e.user_message());
    }

    if let Err(e) = run(&app, &config, cli).await {
        eprintln!("error: {}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}

async fn actor(app: &App, user: Option<&str>) -> Result<User> {
    match user {
        Some(email) => app.accounts.user(email).await,
        None => Err(AppError::Validation(
            "Pass --user or set TRAINLOG_USER".to_string(),
        )),
    }
}

async fn run(app: &App, config: &Config, cli: Cli) -> Result<()> {
    let command = match cli.command {
        Commands::Register {
            email,
            password,
            name,
            admin,
        } => {
            let user = app
                .accounts
                .register(NewUser {
                    email,
                    password,
                    role: if admin { UserRole::Admin } else { UserRole::Student },
                    name,
                })
                .await?;
            println!("Registered {} ({})", user.email, user.role.as_str());
            return Ok(());
        }
        Commands::User(command) => command,
    };

    let user = actor(app, cli.user.as_deref()).await?;
    let unit = app.accounts.unit(&user.email).await?;

    match command {
        UserCommand::Unit { unit: None } => println!("{}", unit.as_str()),
        UserCommand::Unit { unit: Some(input) } => {
            let unit = Unit::parse(&input)
                .ok_or_else(|| AppError::Validation(format!("Unknown unit: {}", input)))?;
            app.accounts.set_unit(&user.email, unit).await?;
            println!("Unit set to {}", unit.as_str());
        }
        UserCommand::Exercises { query, all } => {
            let exercises = if all {
                app.catalog.admin_list(&user, &query).await?
            } else {
                app.catalog.search(&query).await?
            };
            for e in exercises {
                let flag = if e.is_active { "" } else { " [inactive]" };
                println!(
                    "{}  {} ({}, {}){}",
                    e.id, e.name, e.primary_muscle, e.equipment, flag
                );
            }
        }
        UserCommand::Exercise(cmd) => exercise_command(app, &user, cmd).await?,
        UserCommand::Request(cmd) => request_command(app, &user, cmd).await?,
        UserCommand::Template(cmd) => template_command(app, &user, cmd).await?,
        UserCommand::Day(cmd) => day_command(app, &user, cmd).await?,
        UserCommand::Item(cmd) => item_command(app, &user, cmd).await?,
        UserCommand::Session(cmd) => session_command(app, &user, cmd).await?,
        UserCommand::Set(cmd) => set_command(app, &user, unit, cmd).await?,
        UserCommand::Rest(cmd) => rest_command(app, &user, config, cmd).await?,
        UserCommand::History { delete: Some(id) } => {
            let sets = app.sets.delete_session(&user.email, &id).await?;
            println!("Deleted session {} and {} sets", id, sets);
        }
        UserCommand::History { delete: None } => {
            for s in app.sets.history(&user.email).await? {
                let finished = s
                    .session
                    .finished_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{}  {}  {}  {}  {} sets, {} exercises, {}",
                    s.session.id,
                    finished,
                    s.session.template_name,
                    s.duration,
                    s.set_count,
                    s.exercise_count,
                    format_weight(s.volume_kg, unit)
                );
            }
        }
        UserCommand::Repair => {
            let report = app.repair(&user).await?;
            println!(
                "Removed {} days, {} items, {} sets; cleared {} and restored {} session pointers",
                report.templates.days_removed,
                report.templates.items_removed,
                report.sets_removed,
                report.sessions.pointers_cleared,
                report.sessions.pointers_restored
            );
        }
    }
    Ok(())
}

async fn exercise_command(app: &App, user: &User, cmd: ExerciseCommand) -> Result<()> {
    match cmd {
        ExerciseCommand::Add(draft) => {
            let e = app.catalog.create(user, draft.into()).await?;
            println!("Added {} ({})", e.name, e.id);
        }
        ExerciseCommand::Update { id, draft } => {
            let e = app.catalog.update(user, &id, draft.into()).await?;
            println!("Updated {}", e.name);
        }
        ExerciseCommand::Enable { id } => {
            let e = app.catalog.set_active(user, &id, true).await?;
            println!("{} is active", e.name);
        }
        ExerciseCommand::Disable { id } => {
            let e = app.catalog.set_active(user, &id, false).await?;
            println!("{} is inactive", e.name);
        }
        ExerciseCommand::Delete { id } => {
            app.catalog.delete(user, &id).await?;
            println!("Deleted {}", id);
        }
    }
    Ok(())
}

async fn request_command(app: &App, user: &User, cmd: RequestCommand) -> Result<()> {
    match cmd {
        RequestCommand::Submit { name, details } => {
            let r = app.requests.submit(user, &name, &details).await?;
            println!("Request {} submitted", r.id);
        }
        RequestCommand::List | RequestCommand::Pending => {
            let requests = if matches!(cmd, RequestCommand::List) {
                app.requests.mine(user).await?
            } else {
                app.requests.pending(user).await?
            };
            for r in requests {
                println!(
                    "{}  {}  [{}]  {}  {}",
                    r.id,
                    r.name,
                    r.status.as_str(),
                    r.requested_by,
                    r.admin_note
                );
            }
        }
        RequestCommand::Approve { id, draft } => {
            let (_, e) = app.requests.approve(user, &id, draft.into()).await?;
            println!("Approved; added {} ({})", e.name, e.id);
        }
        RequestCommand::Reject { id, note } => {
            app.requests.reject(user, &id, &note).await?;
            println!("Rejected {}", id);
        }
    }
    Ok(())
}

async fn template_command(app: &App, user: &User, cmd: TemplateCommand) -> Result<()> {
    match cmd {
        TemplateCommand::Create { name, notes } => {
            let t = app.templates.create_template(&user.email, &name, &notes).await?;
            println!("Created template {} ({})", t.name, t.id);
        }
        TemplateCommand::List => {
            for t in app.templates.list_templates(&user.email).await? {
                println!("{}  {}", t.id, t.name);
            }
        }
        TemplateCommand::Delete { id } => {
            app.templates.delete_template(&user.email, &id).await?;
            println!("Deleted template {}", id);
        }
        TemplateCommand::Plan { id } => {
            let template = app.templates.get_template(&user.email, &id).await?;
            println!("{}", template.name);
            for plan in app.templates.template_plan(&user.email, &id).await? {
                println!(
                    "\n{} ({}) [{}]",
                    plan.day.weekday,
                    plan.day.muscle_groups.join(", "),
                    plan.day.id
                );
                for group in &plan.groups {
                    print_group(app, group).await?;
                }
            }
        }
    }
    Ok(())
}

async fn print_group(app: &App, group: &ItemGroup) -> Result<()> {
    let p = group.prescription();
    let header = match group.combo_type() {
        Some(combo) if group.is_combo() => format!("  {} ", combo.as_str()),
        _ => "  ".to_string(),
    };
    println!(
        "{}{} x {}, rest {}s  [{}]",
        header,
        p.target_sets,
        p.reps_display(),
        p.rest_seconds,
        group.first().id
    );
    for item in &group.items {
        let name = match app.catalog.get(&item.exercise_id).await {
            Ok(e) => e.name,
            Err(_) => item.exercise_id.clone(),
        };
        println!("    - {}", name);
    }
    Ok(())
}

async fn day_command(app: &App, user: &User, cmd: DayCommand) -> Result<()> {
    match cmd {
        DayCommand::Add {
            template_id,
            weekday,
            groups,
        } => {
            let day = app
                .templates
                .add_day(&user.email, &template_id, weekday, &groups)
                .await?;
            println!("Added {} ({})", day.weekday, day.id);
        }
        DayCommand::List { template_id } => {
            for day in app.templates.list_days(&user.email, &template_id).await? {
                println!(
                    "{}  {}  {}  {}",
                    day.id,
                    day.order,
                    day.weekday,
                    day.muscle_groups.join(", ")
                );
            }
        }
        DayCommand::Delete { id } => {
            app.templates.delete_day(&user.email, &id).await?;
            println!("Deleted day {}", id);
        }
        DayCommand::Order { id, order } => {
            app.templates.set_day_order(&user.email, &id, order).await?;
            println!("Day {} moved to {}", id, order);
        }
    }
    Ok(())
}

async fn item_command(app: &App, user: &User, cmd: ItemCommand) -> Result<()> {
    match cmd {
        ItemCommand::Add {
            day_id,
            exercise_ids,
            combo,
            prescription,
        } => {
            let mut editor = app.templates.open_day_editor(&user.email, &day_id).await?;
            editor.set_combo_type(&combo);
            editor.select_all(&exercise_ids)?;
            let items = editor.commit(prescription.into_prescription()?).await?;
            println!("Added {} items", items.len());
        }
        ItemCommand::Extend {
            first_item_id,
            exercise_id,
        } => {
            let group = app
                .templates
                .add_to_existing_combo(&user.email, &first_item_id, &exercise_id)
                .await?;
            println!("Group now has {} exercises", group.len());
        }
        ItemCommand::Edit {
            first_item_id,
            combo,
            prescription,
        } => {
            let prescription = prescription.into_prescription()?;
            let group = match combo {
                Some(combo) => {
                    let edit = GroupEdit {
                        prescription,
                        combo_type: ComboType::parse(&combo),
                    };
                    app.templates
                        .edit_group(&user.email, &first_item_id, &edit)
                        .await?
                }
                None => {
                    app.templates
                        .edit_group_prescription(&user.email, &first_item_id, prescription)
                        .await?
                }
            };
            println!("Updated {} items", group.len());
        }
        ItemCommand::Remove { first_item_id } => {
            let removed = app
                .templates
                .remove_group(&user.email, &first_item_id)
                .await?;
            println!("Removed {} items", removed);
        }
    }
    Ok(())
}

async fn session_command(app: &App, user: &User, cmd: SessionCommand) -> Result<()> {
    match cmd {
        SessionCommand::Start { template_id } => {
            let s = app.sessions.start_session(&user.email, &template_id).await?;
            println!("Started {} ({})", s.template_name, s.id);
        }
        SessionCommand::Finish => match app.sessions.finish_session(&user.email).await? {
            Some(s) => println!("Finished {} ({})", s.template_name, s.id),
            None => println!("No session running"),
        },
        SessionCommand::Status => match app.sessions.current_session(&user.email).await? {
            Some(s) => {
                let elapsed = app
                    .sessions
                    .elapsed(&user.email)
                    .await?
                    .unwrap_or_else(chrono::Duration::zero);
                println!("{}  {}  {}", s.id, s.template_name, format_clock(elapsed));
            }
            None => println!("No session running"),
        },
    }
    Ok(())
}

async fn set_command(app: &App, user: &User, unit: Unit, cmd: SetCommand) -> Result<()> {
    let session = app
        .sessions
        .current_session(&user.email)
        .await?
        .ok_or_else(|| AppError::NotFound("No session running".to_string()))?;

    match cmd {
        SetCommand::Log {
            exercise_id,
            weight,
            reps,
            rir,
            rpe,
            note,
            rest,
            no_rest,
        } => {
            let input = SetInput {
                weight,
                reps,
                rir,
                rpe,
                note,
            };
            let set = app
                .sets
                .log_set(&session.id, &exercise_id, unit, &input)
                .await?;
            println!(
                "Set {}: {} x {}",
                set.set_index,
                format_weight(set.weight_kg, unit),
                set.reps.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())
            );
            if no_rest {
                return Ok(());
            }
            let rest = match rest {
                Some(seconds) => Some(seconds),
                None => app
                    .templates
                    .prescribed_rest(&user.email, &session.template_id, &exercise_id)
                    .await?,
            };
            if let Some(seconds) = rest {
                app.rest.start(&user.email, seconds).await?;
                println!("Resting {}s", seconds);
            }
        }
        SetCommand::List => {
            for set in app.sets.sets_for_session(&session.id).await? {
                println!(
                    "{}  #{}  {} x {}",
                    set.exercise_id,
                    set.set_index,
                    format_weight(set.weight_kg, unit),
                    set.reps.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())
                );
            }
            let volume = app.sets.aggregate_session_volume(&session.id).await?;
            println!("Volume: {}", format_weight(volume, unit));
        }
    }
    Ok(())
}

fn describe_rest(status: RestStatus) -> String {
    match status {
        RestStatus::Idle => "No rest running".to_string(),
        RestStatus::Running { remaining } => format!("Rest {}s", remaining),
        RestStatus::Expired { overdue } => format!("Rest over ({}s ago)", overdue),
    }
}

async fn rest_command(app: &App, user: &User, config: &Config, cmd: RestCommand) -> Result<()> {
    match cmd {
        RestCommand::Start { seconds } => {
            let seconds = seconds.unwrap_or(config.default_rest_seconds);
            app.rest.start(&user.email, seconds).await?;
            println!("Resting {}s", seconds);
        }
        RestCommand::Stop => {
            app.rest.stop(&user.email).await?;
            println!("Rest stopped");
        }
        RestCommand::Status => println!("{}", describe_rest(app.rest.status(&user.email).await?)),
        RestCommand::Watch => watch_rest(app, user, config).await?,
    }
    Ok(())
}

async fn watch_rest(app: &App, user: &User, config: &Config) -> Result<()> {
    let mut ticker = tokio::time::interval(config.rest_poll_interval());
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let status = app.rest.status(&user.email).await?;
                print!("\r{:<32}", describe_rest(status));
                stdout
                    .flush()
                    .map_err(|e| AppError::Internal(e.to_string()))?;
                if !matches!(status, RestStatus::Running { .. }) {
                    println!();
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
        }
    }
}
