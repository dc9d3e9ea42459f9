use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::warn;
use property_crm::compose::recipient_preview;
use property_crm::utils::{DEFAULT_DIAL_CODE, compose_phone, search};
use property_crm::{
    AppState, CategoryId, CategoryKey, ContactId, Crm, CrmError, JobId, JobStatus,
    MessageComposer, NewContact, NewTemplate, Result, TemplateId,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "property-crm", version, about = "Property CRM command line client")]
struct Cli {
    /// Overrides the stored API url.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    #[command(subcommand)]
    Categories(CategoryCmd),
    #[command(subcommand)]
    Contacts(ContactCmd),
    #[command(subcommand)]
    Templates(TemplateCmd),
    #[command(subcommand)]
    Jobs(JobCmd),
    /// Queue a message for every contact in a category.
    Send {
        /// Category id or name; `name:2024` for a name made of digits.
        category: CategoryKey,
        #[arg(long, conflicts_with = "message", required_unless_present = "message")]
        template: Option<TemplateId>,
        #[arg(long)]
        message: Option<String>,
    },
}

#[derive(Subcommand)]
enum CategoryCmd {
    List,
    Create { name: String },
    Rename { id: CategoryId, name: String },
}

#[derive(Subcommand)]
enum ContactCmd {
    List {
        /// Category id or name; `name:2024` for a name made of digits.
        category: CategoryKey,
        #[arg(long)]
        search: Option<String>,
    },
    Add {
        name: String,
        /// Full `+` number, or a local number combined with --dial-code.
        phone: String,
        #[arg(long)]
        category: CategoryKey,
        #[arg(long, default_value = DEFAULT_DIAL_CODE)]
        dial_code: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        interest: Option<String>,
    },
    Move {
        id: ContactId,
        #[arg(long)]
        from: CategoryKey,
        #[arg(long)]
        to: CategoryKey,
    },
    Delete {
        id: ContactId,
        #[arg(long)]
        from: CategoryKey,
    },
}

#[derive(Subcommand)]
enum TemplateCmd {
    List,
    Create { name: String, content: String },
    Delete { id: TemplateId },
}

#[derive(Subcommand)]
enum JobCmd {
    List {
        #[arg(long)]
        status: Option<JobStatus>,
    },
    Delete { id: JobId },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let mut state = AppState::load();
    if let Some(url) = cli.api_url {
        state.base_url = url;
    }

    match run(cli.command, &mut state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_auth() => {
            state.token = None;
            if let Err(save_err) = state.save() {
                warn!("could not clear stored token: {}", save_err);
            }
            eprintln!("{e}. Run `property-crm login` first.");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, state: &mut AppState) -> Result<()> {
    match command {
        Command::Login { username, password } => {
            let crm = Crm::from_state(state)?;
            crm.api().login(&username, &password).await?;
            state.token = crm.session().token();
            state.save()?;
            println!("Logged in.");
            Ok(())
        }
        Command::Logout => {
            state.token = None;
            state.save()?;
            println!("Logged out.");
            Ok(())
        }
        command => {
            if !state.is_authenticated() {
                return Err(CrmError::Auth("not logged in".into()));
            }
            let crm = Crm::from_state(state)?;
            run_protected(command, &crm).await
        }
    }
}

async fn run_protected(command: Command, crm: &Crm) -> Result<()> {
    match command {
        Command::Categories(cmd) => categories(cmd, crm).await,
        Command::Contacts(cmd) => contacts(cmd, crm).await,
        Command::Templates(cmd) => templates(cmd, crm).await,
        Command::Jobs(cmd) => jobs(cmd, crm).await,
        Command::Send {
            category,
            template,
            message,
        } => send(crm, category, template, message).await,
        Command::Login { .. } | Command::Logout => Ok(()),
    }
}

async fn categories(cmd: CategoryCmd, crm: &Crm) -> Result<()> {
    match cmd {
        CategoryCmd::List => {
            let list = crm.categories.list().await?;
            if list.is_empty() {
                println!("No categories yet.");
            }
            for c in list {
                println!("{:>5}  {}", c.id, c.name);
            }
        }
        CategoryCmd::Create { name } => {
            let c = crm.categories.create(&name).await?;
            println!("Created category {} ({}).", c.name, c.id);
        }
        CategoryCmd::Rename { id, name } => {
            let c = crm.contacts.rename_category(id, &name).await?;
            println!("Category {} is now {}.", c.id, c.name);
        }
    }
    Ok(())
}

async fn contacts(cmd: ContactCmd, crm: &Crm) -> Result<()> {
    match cmd {
        ContactCmd::List { category, search: query } => {
            let list = crm.contacts.list(&category).await?;
            let shown = search(&list, query.as_deref().unwrap_or(""));
            if shown.is_empty() {
                println!("No contacts found.");
            }
            for c in shown {
                let flag = if c.has_valid_phone() { ' ' } else { '!' };
                println!(
                    "{:>5}  {:<24} {}{:<17} {}",
                    c.id,
                    c.name,
                    flag,
                    c.phone,
                    c.email.as_deref().unwrap_or("")
                );
            }
        }
        ContactCmd::Add {
            name,
            phone,
            category,
            dial_code,
            email,
            interest,
        } => {
            let phone = if phone.starts_with('+') {
                phone
            } else {
                compose_phone(&dial_code, &phone)
            };
            let c = crm
                .contacts
                .create(NewContact {
                    name,
                    phone,
                    email,
                    property_interest: interest,
                    category,
                })
                .await?;
            println!("Added {} ({}) to {}.", c.name, c.id, c.category.name);
        }
        ContactCmd::Move { id, from, to } => {
            let c = crm.contacts.reassign(&from, id, to).await?;
            println!("Moved {} to {}.", c.name, c.category.name);
        }
        ContactCmd::Delete { id, from } => {
            crm.contacts.delete(&from, id).await?;
            println!("Deleted contact {id}.");
        }
    }
    Ok(())
}

async fn templates(cmd: TemplateCmd, crm: &Crm) -> Result<()> {
    match cmd {
        TemplateCmd::List => {
            for t in crm.templates.list().await? {
                println!("{:>5}  {:<20} {}", t.id, t.name, t.content);
            }
        }
        TemplateCmd::Create { name, content } => {
            let t = crm.templates.create(NewTemplate { name, content }).await?;
            println!("Created template {} ({}).", t.name, t.id);
        }
        TemplateCmd::Delete { id } => {
            crm.templates.delete(id).await?;
            println!("Deleted template {id}.");
        }
    }
    Ok(())
}

async fn jobs(cmd: JobCmd, crm: &Crm) -> Result<()> {
    match cmd {
        JobCmd::List { status } => {
            let list = crm.jobs.list(status).await?;
            if list.is_empty() {
                println!("No jobs found.");
            }
            for j in list {
                let created = j
                    .created()
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| j.created_at.clone());
                println!(
                    "{:>5}  {:<8} {}  {:>3} recipients  {}",
                    j.id,
                    j.status,
                    created,
                    j.recipient_count(),
                    j.message
                );
            }
        }
        JobCmd::Delete { id } => {
            crm.jobs.delete(id).await?;
            println!("Deleted job {id}.");
        }
    }
    Ok(())
}

async fn send(
    crm: &Crm,
    category: CategoryKey,
    template: Option<TemplateId>,
    message: Option<String>,
) -> Result<()> {
    let category = crm.categories.resolve(&category).await?;
    let mut composer = MessageComposer::new();
    composer.select_category(category.id);
    match (template, message) {
        (Some(id), _) => composer.apply_template(&crm.templates.get(id).await?),
        (None, Some(message)) => composer.message = message,
        (None, None) => return Err(CrmError::validation("pass --template or --message")),
    }

    let recipients = composer.recipients(&crm.contacts).await?;
    println!("To {}: {}", category.name, recipient_preview(&recipients));
    let handle = composer.send(&crm.contacts, &crm.jobs).await?;
    match handle.id {
        Some(id) => println!("Job {id} created for {} contacts.", handle.recipient_count),
        None => println!("Job created for {} contacts.", handle.recipient_count),
    }
    Ok(())
}
