//! Command parsing and the UI-layer dispatcher.
//!
//! Every library failure comes back as a `ClientError`; [`report`] is the one
//! place that turns its presentation kind into terminal output.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::outputformatter as fmt;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, Presentation};
use crate::gateway::AuthenticatedGateway;
use crate::identity::SessionStore;
use crate::recipes::{can_modify, RecipeApi, RecipeDraft, SearchCriteria};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: String, password: String },
    Logout,
    Status,
    List,
    Mine,
    Categories,
    Show { id: String },
    Create { fields: DraftFields },
    Update { id: String, fields: DraftFields },
    Delete { id: String },
    Search { criteria: SearchCriteria },
    Dashboard,
    Admin,
    Help,
    Quit,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login { .. } => "login",
            Command::Logout => "logout",
            Command::Status => "status",
            Command::List => "list",
            Command::Mine => "mine",
            Command::Categories => "categories",
            Command::Show { .. } => "show",
            Command::Create { .. } => "create",
            Command::Update { .. } => "update",
            Command::Delete { .. } => "delete",
            Command::Search { .. } => "search",
            Command::Dashboard => "dashboard",
            Command::Admin => "admin",
            Command::Help => "help",
            Command::Quit => "quit",
        }
    }
}

/// Draft fields given on the command line; unset ones keep their current value on update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftFields {
    pub title: Option<String>,
    pub category: Option<String>,
    pub cooking_time: Option<u32>,
    pub ingredients: Option<Vec<String>>,
    pub instructions: Option<String>,
}

impl DraftFields {
    pub fn apply(&self, mut draft: RecipeDraft) -> RecipeDraft {
        if let Some(t) = &self.title { draft.title = t.trim().to_string(); }
        if let Some(c) = &self.category { draft.category = c.trim().to_lowercase(); }
        if let Some(m) = self.cooking_time { draft.cooking_time = m; }
        if let Some(i) = &self.ingredients { draft.ingredients = i.clone(); }
        if let Some(s) = &self.instructions { draft.instructions = s.trim().to_string(); }
        draft
    }
}

pub const HELP: &str = "\
Commands:
  login <user> <password>            sign in and remember the session
  logout                             forget the session
  status                             show who is signed in
  list                               all recipes
  mine                               recipes you created
  categories                         known categories
  show <id>                          one recipe
  create --title T --category C --time MIN --ingredients \"a;b\" --instructions TEXT
  update <id> [same flags as create] change only the given fields
  delete <id>                        remove a recipe
  search [--title T] [--category C] [--max-time MIN] [--ingredient I]
  dashboard                          counts and recent recipes
  admin                              admin counters (administrators only)
  help                               this text
  quit | exit                        leave the interpreter";

/// Split a line into words, honouring double quotes.
pub fn split_args(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut has_word = false;
    for ch in line.chars() {
        match ch {
            '"' => { in_quotes = !in_quotes; has_word = true; }
            c if c.is_whitespace() && !in_quotes => {
                if has_word { out.push(std::mem::take(&mut cur)); has_word = false; }
            }
            c => { cur.push(c); has_word = true; }
        }
    }
    if has_word { out.push(cur); }
    out
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i + 1).map(String::as_str).ok_or_else(|| format!("{} requires a value", flag))
}

fn parse_minutes(raw: &str, flag: &str) -> Result<u32, String> {
    raw.trim().parse::<u32>().map_err(|_| format!("{} expects a whole number of minutes", flag))
}

fn parse_draft_flags(args: &[String]) -> Result<DraftFields, String> {
    let mut f = DraftFields::default();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let v = flag_value(args, i, flag)?;
        match flag {
            "--title" => f.title = Some(v.to_string()),
            "--category" => f.category = Some(v.to_string()),
            "--time" => f.cooking_time = Some(parse_minutes(v, flag)?),
            "--ingredients" => f.ingredients = Some(RecipeDraft::parse_ingredients(&v.replace(';', "\n"))),
            "--instructions" => f.instructions = Some(v.to_string()),
            other => return Err(format!("unknown flag: {}", other)),
        }
        i += 2;
    }
    Ok(f)
}

fn parse_search_flags(args: &[String]) -> Result<SearchCriteria, String> {
    let mut c = SearchCriteria::default();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let v = flag_value(args, i, flag)?;
        match flag {
            "--title" => c.title = Some(v.to_string()),
            "--category" => c.category = Some(v.to_string()),
            "--max-time" => c.max_cooking_time = Some(parse_minutes(v, flag)?),
            "--ingredient" => c.ingredient = Some(v.to_string()),
            other => return Err(format!("unknown flag: {}", other)),
        }
        i += 2;
    }
    Ok(c)
}

fn one_id(args: &[String], usage: &str) -> Result<String, String> {
    match args {
        [id] => Ok(id.clone()),
        _ => Err(format!("usage: {}", usage)),
    }
}

pub fn parse_command(args: &[String]) -> Result<Command, String> {
    let Some((head, rest)) = args.split_first() else {
        return Err("no command given; try 'help'".to_string());
    };
    match head.to_ascii_lowercase().as_str() {
        "login" => match rest {
            [u, p] => Ok(Command::Login { username: u.clone(), password: p.clone() }),
            _ => Err("usage: login <user> <password>".to_string()),
        },
        "logout" => Ok(Command::Logout),
        "status" | "whoami" => Ok(Command::Status),
        "list" => Ok(Command::List),
        "mine" => Ok(Command::Mine),
        "categories" => Ok(Command::Categories),
        "show" => Ok(Command::Show { id: one_id(rest, "show <id>")? }),
        "delete" => Ok(Command::Delete { id: one_id(rest, "delete <id>")? }),
        "create" => Ok(Command::Create { fields: parse_draft_flags(rest)? }),
        "update" => {
            let Some((id, flags)) = rest.split_first() else {
                return Err("usage: update <id> [--title ..] [--category ..] [--time ..] [--ingredients ..] [--instructions ..]".to_string());
            };
            Ok(Command::Update { id: id.clone(), fields: parse_draft_flags(flags)? })
        }
        "search" => Ok(Command::Search { criteria: parse_search_flags(rest)? }),
        "dashboard" => Ok(Command::Dashboard),
        "admin" => Ok(Command::Admin),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command: {}", other)),
    }
}

/// Wired-up client: one session store shared by the gateway and the UI.
#[derive(Clone)]
pub struct App {
    pub session: Arc<SessionStore>,
    pub api: RecipeApi,
    pub json_output: bool,
}

impl App {
    /// Build the client from config and restore any persisted session.
    pub fn from_config(cfg: &ClientConfig) -> ClientResult<Self> {
        let http = cfg.http_client()?;
        let session = Arc::new(SessionStore::new(http.clone(), cfg.base_url.clone(), cfg.storage()));
        session.restore();
        let gateway = AuthenticatedGateway::new(session.clone(), http, cfg.base_url.clone());
        Ok(Self { session, api: RecipeApi::new(gateway), json_output: cfg.json_output })
    }

    fn render<T: Serialize>(&self, value: &T, text: impl FnOnce(&T) -> String) -> String {
        if self.json_output {
            serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
        } else {
            text(value)
        }
    }

    pub fn prompt(&self) -> String {
        match self.session.username() {
            Some(u) => format!("{}> ", u),
            None => "> ".to_string(),
        }
    }

    /// Run one command and return what to print.
    pub async fn execute(&self, cmd: Command) -> ClientResult<String> {
        debug!(target: "recipebox::cli", command = cmd.name(), "execute");
        match cmd {
            Command::Login { username, password } => {
                let s = self.session.login(&username, &password).await?;
                Ok(format!("signed in as {} ({})", s.username, s.roles.join(", ")))
            }
            Command::Logout => {
                self.session.logout();
                Ok("signed out".to_string())
            }
            Command::Status => Ok(match self.session.session() {
                Some(s) => {
                    let mut line = format!("signed in as {} ({})", s.username, s.roles.join(", "));
                    if let Some(exp) = s.expires_at {
                        line.push_str(&format!(", token expires {}", exp.to_rfc3339()));
                    }
                    line
                }
                None => "not signed in".to_string(),
            }),
            Command::List => {
                let v = self.api.list_all().await?;
                Ok(self.render(&v, |v| fmt::recipe_table(v)))
            }
            Command::Mine => {
                let v = self.api.list_mine().await?;
                Ok(self.render(&v, |v| fmt::recipe_table(v)))
            }
            Command::Categories => {
                let v = self.api.categories().await?;
                Ok(self.render(&v, |v| fmt::category_list(v)))
            }
            Command::Show { id } => {
                let r = self.api.get(&id).await?;
                let editable = can_modify(&self.session, &r);
                Ok(self.render(&r, |r| fmt::recipe_detail(r, editable)))
            }
            Command::Create { fields } => {
                let draft = fields.apply(RecipeDraft::default());
                let r = self.api.create(&draft).await?;
                Ok(format!("created recipe {} ({})", r.title, r.id))
            }
            Command::Update { id, fields } => {
                let current = self.api.get(&id).await?;
                let draft = fields.apply(RecipeDraft::from(&current));
                let r = self.api.update(&id, &draft).await?;
                Ok(format!("updated recipe {} ({})", r.title, r.id))
            }
            Command::Delete { id } => {
                self.api.delete(&id).await?;
                Ok(format!("deleted recipe {}", id))
            }
            Command::Search { criteria } => {
                let v = self.api.search(&criteria).await?;
                Ok(self.render(&v, |v| fmt::recipe_table(v)))
            }
            Command::Dashboard => {
                let d = self.api.dashboard().await;
                if d.expired() {
                    return Err(ClientError::SessionExpired);
                }
                Ok(fmt::dashboard(&d))
            }
            Command::Admin => {
                let a = self.api.admin_overview().await?;
                if a.expired() {
                    return Err(ClientError::SessionExpired);
                }
                Ok(fmt::admin_overview(&a))
            }
            Command::Help => Ok(HELP.to_string()),
            Command::Quit => Ok(String::new()),
        }
    }
}

/// Map an error to terminal output according to its presentation kind.
pub fn report(err: &ClientError) -> String {
    match err.presentation() {
        Presentation::Inline => format!("login failed: {}", err),
        Presentation::Notification => format!("error: {}", err),
        Presentation::ForceLogin => format!("{} Use 'login <user> <password>' to continue.", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> { split_args(s) }

    #[test]
    fn split_honours_quotes() {
        assert_eq!(words(r#"create --title "Apple pie" --time 40"#), vec!["create", "--title", "Apple pie", "--time", "40"]);
        assert_eq!(words(r#"  a  "" b "#), vec!["a", "", "b"]);
    }

    #[test]
    fn parse_login_and_errors() {
        assert_eq!(
            parse_command(&words("login admin secret")).unwrap(),
            Command::Login { username: "admin".into(), password: "secret".into() }
        );
        assert!(parse_command(&words("login admin")).is_err());
        assert!(parse_command(&words("frobnicate")).is_err());
        assert!(parse_command(&[]).is_err());
        assert_eq!(parse_command(&words("EXIT")).unwrap(), Command::Quit);
    }

    #[test]
    fn parse_create_flags() {
        let cmd = parse_command(&words(r#"create --title Soup --category Main --time 25 --ingredients "water; salt ;" --instructions "Boil it""#)).unwrap();
        let Command::Create { fields } = cmd else { panic!("expected create") };
        let d = fields.apply(RecipeDraft::default());
        assert_eq!(d.title, "Soup");
        assert_eq!(d.category, "main");
        assert_eq!(d.cooking_time, 25);
        assert_eq!(d.ingredients, vec!["water", "salt"]);
        assert_eq!(d.instructions, "Boil it");
        assert!(d.validate().is_ok());
    }

    #[test]
    fn draft_text_fields_are_trimmed() {
        let cmd = parse_command(&words(r#"create --title " Soup " --instructions "  Boil it  ""#)).unwrap();
        let Command::Create { fields } = cmd else { panic!("expected create") };
        let d = fields.apply(RecipeDraft::default());
        assert_eq!(d.title, "Soup");
        assert_eq!(d.instructions, "Boil it");
    }

    #[test]
    fn parse_rejects_bad_flags() {
        assert!(parse_command(&words("create --time soon")).is_err());
        assert!(parse_command(&words("create --colour red")).is_err());
        assert!(parse_command(&words("search --title")).is_err());
        assert!(parse_command(&words("show")).is_err());
        assert!(parse_command(&words("update")).is_err());
    }

    #[test]
    fn update_keeps_unset_fields() {
        let cmd = parse_command(&words("update 7 --time 90")).unwrap();
        let Command::Update { id, fields } = cmd else { panic!("expected update") };
        assert_eq!(id, "7");
        let base = RecipeDraft { title: "Stew".into(), cooking_time: 60, ..Default::default() };
        let d = fields.apply(base);
        assert_eq!(d.title, "Stew");
        assert_eq!(d.cooking_time, 90);
    }

    #[test]
    fn parse_search() {
        let cmd = parse_command(&words("search --ingredient egg --max-time 15")).unwrap();
        assert_eq!(
            cmd,
            Command::Search {
                criteria: SearchCriteria { ingredient: Some("egg".into()), max_cooking_time: Some(15), ..Default::default() }
            }
        );
    }

    #[test]
    fn report_follows_presentation() {
        assert_eq!(report(&ClientError::authentication("Invalid credentials")), "login failed: Invalid credentials");
        assert_eq!(report(&ClientError::request(Some(500), "boom")), "error: boom");
        assert!(report(&ClientError::SessionExpired).starts_with("Session expired."));
    }
}
