// src/commands.rs
use clap::{Args, Parser, Subcommand};
use std::io::{BufRead, Write};
use tracing::{info, warn};

use gearhub::catalog::Catalog;
use gearhub::error::{CatalogError, Result};
use gearhub::logging::SharedDiagnostics;
use gearhub::models::{Category, Gear, GearDraft, Role, Suggestion, User};
use gearhub::session::SessionStore;
use gearhub::view::{self, SortBy, Tab};

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Log in and remember the session
    Login {
        username: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the current session
    Logout,
    /// Show the current session
    Whoami,
    /// List gears of one category
    Gears {
        #[arg(long, short, default_value = "joueurs", value_parser = parse_category)]
        category: Category,
        #[arg(long, short)]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = SortBy::Name)]
        sort: SortBy,
    },
    /// Gear count per category
    Categories,
    /// Propose a new gear (no login needed)
    Suggest(GearFields),
    /// List suggestions
    Suggestions {
        /// Only show suggestions awaiting moderation
        #[arg(long)]
        pending: bool,
    },
    Approve { id: String },
    Reject { id: String },
    /// List user accounts (créateur)
    Users,
    /// Create a user account (créateur)
    CreateUser {
        username: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
        #[arg(long, default_value = "modérateur")]
        role: String,
    },
    /// Add a gear directly (créateur, responsable)
    AddGear(GearFields),
    /// Edit fields of an existing gear (créateur, responsable)
    EditGear {
        id: String,
        #[command(flatten)]
        changes: GearChanges,
    },
    /// Delete a gear after confirmation (créateur, responsable)
    DeleteGear {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Interactive session keeping view state between commands
    Shell,
}

#[derive(Args, Debug, Clone)]
pub struct GearFields {
    #[arg(long)]
    name: String,
    #[arg(long)]
    nickname: String,
    #[arg(long)]
    gear_id: String,
    #[arg(long)]
    image_url: String,
    #[arg(long)]
    description: String,
    #[arg(long, default_value = "joueurs", value_parser = parse_category)]
    category: Category,
}

impl From<GearFields> for GearDraft {
    fn from(fields: GearFields) -> Self {
        GearDraft {
            name: fields.name,
            nickname: fields.nickname,
            gear_id: fields.gear_id,
            image_url: fields.image_url,
            description: fields.description,
            category: fields.category,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct GearChanges {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    nickname: Option<String>,
    #[arg(long)]
    gear_id: Option<String>,
    #[arg(long)]
    image_url: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long, value_parser = parse_category)]
    category: Option<Category>,
}

impl GearChanges {
    fn apply(self, gear: &mut Gear) {
        if let Some(v) = self.name {
            gear.name = v;
        }
        if let Some(v) = self.nickname {
            gear.nickname = v;
        }
        if let Some(v) = self.gear_id {
            gear.gear_id = v;
        }
        if let Some(v) = self.image_url {
            gear.image_url = v;
        }
        if let Some(v) = self.description {
            gear.description = v;
        }
        if let Some(v) = self.category {
            gear.category = v;
        }
    }
}

fn parse_category(value: &str) -> std::result::Result<Category, String> {
    Category::parse(value).ok_or_else(|| {
        format!(
            "unknown category '{}' (expected one of: {})",
            value,
            Category::ALL.map(|c| c.id()).join(", ")
        )
    })
}

/// Everything a command needs
pub struct App {
    pub sessions: SessionStore,
    pub catalog: Catalog,
    pub diagnostics: SharedDiagnostics,
}

pub async fn run(app: &mut App, command: Commands) -> Result<()> {
    match command {
        Commands::Login { username, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt("Mot de passe : ")?,
            };
            let session = report(
                app.sessions.login(&username, &password).await,
                "Connexion impossible",
            )?;
            println!("Connecté ({})", session.role);
        }
        Commands::Logout => {
            app.sessions.logout().await?;
            app.catalog.forget_session();
            println!("Déconnecté");
        }
        Commands::Whoami => whoami(app).await,
        Commands::Gears {
            category,
            search,
            sort,
        } => {
            app.catalog.refresh_gears().await?;
            app.catalog.view.active_tab = Tab::Gears;
            app.catalog.view.selected_category = category;
            app.catalog.view.search = search.unwrap_or_default();
            app.catalog.view.sort = sort;
            print_gears(&app.catalog.visible_gears());
        }
        Commands::Categories => {
            app.catalog.refresh_gears().await?;
            for (category, count) in view::category_counts(app.catalog.gears()) {
                println!("{:<12} {} gears", category.label(), count);
            }
        }
        Commands::Suggest(fields) => {
            let form = &mut app.catalog.view.suggestion_form;
            form.draft = fields.into();
            form.open();
            let suggestion = report(
                app.catalog.submit_suggestion().await,
                "Erreur lors de l'envoi de la suggestion",
            )?;
            println!("Suggestion envoyée avec succès ! ({})", suggestion.id);
        }
        Commands::Suggestions { pending } => {
            let session = app.sessions.current();
            app.catalog.refresh_suggestions(session).await?;
            app.catalog.view.active_tab = Tab::Suggestions;
            let counts = app.catalog.status_counts();
            println!(
                "{} en attente / {} approuvées / {} rejetées",
                counts.pending, counts.approved, counts.rejected
            );
            let can_moderate = app
                .sessions
                .current()
                .is_some_and(|s| s.role.can_moderate());
            let shown: Vec<&Suggestion> = app
                .catalog
                .suggestions()
                .iter()
                .filter(|s| !pending || !s.status.is_terminal())
                .collect();
            print_suggestions(&shown, can_moderate);
        }
        Commands::Approve { id } => {
            let session = app.sessions.current();
            report(
                app.catalog.approve_suggestion(session, &id).await,
                "Erreur lors de l'approbation",
            )?;
            println!("Suggestion approuvée !");
        }
        Commands::Reject { id } => {
            let session = app.sessions.current();
            report(
                app.catalog.reject_suggestion(session, &id).await,
                "Erreur lors du rejet",
            )?;
            println!("Suggestion rejetée !");
        }
        Commands::Users => {
            let session = app.sessions.current();
            app.catalog.refresh_users(session).await?;
            app.catalog.view.active_tab = Tab::Users;
            print_users(app.catalog.users());
        }
        Commands::CreateUser {
            username,
            password,
            role,
        } => {
            let password = match password {
                Some(p) => p,
                None => prompt("Mot de passe du nouvel utilisateur : ")?,
            };
            let session = app.sessions.current();
            let form = &mut app.catalog.view.user_form;
            form.username = username;
            form.password = password;
            form.role = Role::from(role);
            report(
                app.catalog.create_user(session).await,
                "Erreur lors de la création de l'utilisateur",
            )?;
            println!("Utilisateur créé avec succès !");
        }
        Commands::AddGear(fields) => {
            let session = app.sessions.current();
            let gear = report(
                app.catalog.create_gear(session, &fields.into()).await,
                "Erreur lors de la création du gear",
            )?;
            println!("Gear créé ({})", gear.id);
        }
        Commands::EditGear { id, changes } => {
            let session = app.sessions.current();
            app.catalog.refresh_gears().await?;
            let editing = app
                .catalog
                .begin_edit(&id)
                .ok_or_else(|| CatalogError::NotFound {
                    resource: format!("gear {}", id),
                })?;
            changes.apply(editing);
            let result = app.catalog.update_gear(session).await;
            if result.is_err() {
                app.catalog.cancel_edit();
            }
            report(result, "Erreur lors de la mise à jour du gear")?;
            println!("Gear mis à jour avec succès !");
        }
        Commands::DeleteGear { id, yes } => {
            let session = app.sessions.current();
            let deleted = report(
                app.catalog
                    .delete_gear(session, &id, |_| yes || confirm_delete())
                    .await,
                "Erreur lors de la suppression du gear",
            )?;
            if deleted {
                println!("Gear supprimé avec succès !");
            } else {
                println!("Suppression annulée");
            }
        }
        Commands::Shell => println!("Déjà dans le shell"),
    }
    Ok(())
}

async fn whoami(app: &App) {
    let Some(session) = app.sessions.current() else {
        println!("Non connecté");
        return;
    };

    println!("Rôle : {}", session.role);
    if let Some(claims) = session.claims() {
        if let Some(sub) = &claims.sub {
            println!("Utilisateur : {}", sub);
        }
        if let Some(exp) = claims.expires_at() {
            println!("Expire le : {}", exp.format("%Y-%m-%d %H:%M UTC"));
        }
    }
    match app.catalog.current_user(Some(session)).await {
        Ok(user) => println!("Compte créé le : {}", user.created_at.format("%Y-%m-%d")),
        Err(e) => warn!("Could not confirm session with the server: {}", e),
    }
}

#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    #[command(flatten)]
    Catalog(Commands),
    /// Show recent warnings and errors
    Logs {
        #[arg(default_value_t = 20)]
        count: usize,
        /// Empty the buffer after printing
        #[arg(long)]
        clear: bool,
    },
    /// Show the tabs available to the current session
    Tabs,
    #[command(alias = "quit")]
    Exit,
}

/// Read-eval loop over stdin. View state and caches live as long as the loop.
pub async fn shell(app: &mut App) -> Result<()> {
    let session = app.sessions.current().cloned();
    if let Err(e) = app.catalog.refresh_all(session.as_ref()).await {
        eprintln!("{}", e.user_message());
    }
    info!("Shell started with {} gears loaded", app.catalog.gears().len());

    loop {
        let line = match prompt("gearhub> ") {
            Ok(line) => line,
            Err(_) => break,
        };
        let words = split_args(&line);
        if words.is_empty() {
            continue;
        }

        let parsed = match ShellLine::try_parse_from(words) {
            Ok(parsed) => parsed,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };

        match parsed.command {
            ShellCommand::Exit => break,
            ShellCommand::Logs { count, clear } => {
                for entry in app.diagnostics.get_recent(count) {
                    println!("{}", entry.format());
                }
                if clear {
                    app.diagnostics.clear();
                }
            }
            ShellCommand::Tabs => {
                let tabs = view::visible_tabs(app.sessions.current());
                let labels: Vec<String> = tabs
                    .iter()
                    .map(|t| {
                        let marker = if *t == app.catalog.view.active_tab { "*" } else { " " };
                        match t {
                            Tab::Suggestions => format!(
                                "{}suggestions ({})",
                                marker,
                                app.catalog.pending_count()
                            ),
                            other => format!("{}{:?}", marker, other).to_lowercase(),
                        }
                    })
                    .collect();
                println!("{}", labels.join("  "));
            }
            ShellCommand::Catalog(command) => {
                let reload = matches!(command, Commands::Login { .. });
                if let Err(e) = run(app, command).await {
                    eprintln!("{}", e.user_message());
                } else if reload {
                    let session = app.sessions.current().cloned();
                    let _ = app.catalog.refresh_all(session.as_ref()).await;
                }
            }
        }
    }
    Ok(())
}

/// Print `failure` before handing the error on
fn report<T>(result: Result<T>, failure: &str) -> Result<T> {
    if result.is_err() {
        eprintln!("{}", failure);
    }
    result
}

fn confirm_delete() -> bool {
    prompt("Êtes-vous sûr de vouloir supprimer ce gear ? [o/N] ")
        .map(|answer| matches!(answer.trim().to_lowercase().as_str(), "o" | "oui" | "y" | "yes"))
        .unwrap_or(false)
}

/// Read one line from stdin. End of input is an error.
fn prompt(label: &str) -> Result<String> {
    let io_error = |e: std::io::Error| CatalogError::InvalidInput {
        message: e.to_string(),
    };
    print!("{}", label);
    std::io::stdout().flush().map_err(io_error)?;
    let mut line = String::new();
    let read = std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(io_error)?;
    if read == 0 {
        return Err(CatalogError::InvalidInput {
            message: "end of input".to_string(),
        });
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Split a shell line on whitespace, honouring single and double quotes
fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut has_token = false;

    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                has_token = true;
            }
            None if ch.is_whitespace() => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            None => {
                current.push(ch);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}

fn print_gears(gears: &[&Gear]) {
    if gears.is_empty() {
        println!("Aucun gear");
        return;
    }
    for gear in gears {
        println!(
            "{}  {} « {} »  [{}]  {}",
            gear.id,
            gear.name,
            gear.nickname,
            gear.gear_id,
            gear.created_at.format("%Y-%m-%d")
        );
        println!("    {}", gear.description);
    }
}

/// Pending rows get an approve/reject hint only for roles the server lets moderate
fn print_suggestions(suggestions: &[&Suggestion], can_moderate: bool) {
    for s in suggestions {
        println!(
            "{}  {:?}  {} « {} »  {}  [{}]",
            s.id,
            s.status,
            s.name,
            s.nickname,
            s.category.label(),
            s.gear_id
        );
        if can_moderate && !s.status.is_terminal() {
            println!("    approve {0} | reject {0}", s.id);
        }
    }
}

fn print_users(users: &[User]) {
    for user in users {
        println!(
            "{:<20} {:<12} {}",
            user.username,
            user.role,
            user.created_at.format("%Y-%m-%d")
        );
    }
}
