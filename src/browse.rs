use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio::io::{AsyncBufReadExt as _, BufReader};

use crate::catalogue::{DISPLAY_HEADERS, Filter, display_cells};
use crate::cli::SessionArgs;
use crate::config::{AppConfig, DEFAULT_CACHE_DIR, DEFAULT_STORE_DIR, resolve_dir};
use crate::session::{Identity, Session, SessionSettings};
use crate::sheet_store::{LocalFsSheetStore, SheetStore};

const HELP: &str = "\
commands:
  list                       show the catalogue view (numbered)
  facets                     show places and the rows/columns/subrows on offer
  place <a>[,<b>...]|all|default
  row <n>|all
  column <n>|all
  subrow <x>|all
  search [text]              search title/author/year (replaces other filters)
  filter                     show the active filter
  add <n>...                 move listed rows into the cart
  remove <orig_idx>...       put cart rows back into the catalogue
  cart                       show the cart
  empty                      empty the cart
  export                     print the cart as a pick-list
  quit";

/// How long a pending background cart sync may hold up process exit.
pub const SYNC_GRACE: Duration = Duration::from_secs(5);

/// Checks the user against the allow-list and loads their session.
pub async fn open_session(args: &SessionArgs) -> anyhow::Result<Session> {
    let config = AppConfig::load(Path::new(&args.config))?;
    if !config.is_allowed(&args.email) {
        anyhow::bail!("user not authorised: {}", args.email);
    }
    if args.given_name.trim().is_empty() {
        anyhow::bail!("--given-name must not be empty");
    }

    let store_dir = resolve_dir(
        args.store_dir.as_deref(),
        "BOOKCART_STORE_DIR",
        DEFAULT_STORE_DIR,
    );
    let cache_dir = resolve_dir(
        args.cache_dir.as_deref(),
        "BOOKCART_CACHE_DIR",
        DEFAULT_CACHE_DIR,
    );
    tracing::debug!(
        store_dir = %store_dir.display(),
        cache_dir = %cache_dir.display(),
        "opening session"
    );

    let store: Arc<dyn SheetStore> = Arc::new(LocalFsSheetStore::new(store_dir));
    let settings = SessionSettings {
        catalogue_sheet: config.catalogue_sheet,
        sent_away_place: config.sent_away_place,
        cache_dir,
    };
    let identity = Identity {
        email: args.email.trim().to_owned(),
        given_name: args.given_name.trim().to_owned(),
    };
    Session::load(store, &settings, &identity).await
}

pub async fn run(args: SessionArgs) -> anyhow::Result<()> {
    let mut session = open_session(&args).await?;
    let mut shell = Shell::new(&session);
    let mut out = std::io::stdout();

    writeln!(out, "Logged in as {}. Type `help` for commands.", args.email)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        write!(out, "bookcart> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await.context("read command")? else {
            writeln!(out)?;
            break;
        };
        match shell.execute(&mut session, &line, &mut out).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(err) => eprintln!("error: {err:#}"),
        }
    }

    session.finish_background_sync(SYNC_GRACE).await;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Command interpreter for one session. Holds the active filter; the
/// positions accepted by `add` refer to the view under that filter.
#[derive(Debug, Clone)]
pub struct Shell {
    filter: Filter,
}

impl Shell {
    pub fn new(session: &Session) -> Self {
        Self {
            filter: session.default_filter(),
        }
    }

    pub async fn execute<W: Write>(
        &mut self,
        session: &mut Session,
        line: &str,
        out: &mut W,
    ) -> anyhow::Result<Flow> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "help" => writeln!(out, "{HELP}")?,
            "quit" | "exit" => return Ok(Flow::Quit),
            "list" => self.print_view(session, out)?,
            "facets" => {
                let facets = session.facets(&self.filter);
                writeln!(out, "places:  {}", facets.places.join(", "))?;
                writeln!(out, "rows:    {}", join_numbers(&facets.rows))?;
                writeln!(out, "columns: {}", join_numbers(&facets.columns))?;
                writeln!(out, "subrows: {}", facets.subrows.join(", "))?;
            }
            "place" => {
                self.filter.places = match rest {
                    "all" => None,
                    "default" => session.default_filter().places,
                    _ => Some(parse_places(session, rest)?),
                };
                self.print_filter(out)?;
            }
            "row" => {
                self.filter.row = parse_number_or_all(rest).context("row")?;
                self.print_filter(out)?;
            }
            "column" => {
                self.filter.column = parse_number_or_all(rest).context("column")?;
                self.print_filter(out)?;
            }
            "subrow" => {
                self.filter.subrow = match rest {
                    "" => anyhow::bail!("subrow: expected a subrow letter or `all`"),
                    "all" => None,
                    letter => Some(letter.to_owned()),
                };
                self.print_filter(out)?;
            }
            "search" => {
                self.filter.search = (!rest.is_empty()).then(|| rest.to_owned());
                self.print_filter(out)?;
            }
            "filter" => self.print_filter(out)?,
            "add" => {
                let positions = parse_list_positions(rest)?;
                let added = session.add_selected(&self.filter, &positions).await?;
                writeln!(
                    out,
                    "added {added} to the cart ({} in cart)",
                    session.cart().len()
                )?;
            }
            "remove" => {
                let origin_indices = parse_numbers::<usize>(rest).context("remove")?;
                let removed = session.remove(&origin_indices).await?;
                writeln!(
                    out,
                    "removed {removed} from the cart ({} in cart)",
                    session.cart().len()
                )?;
            }
            "cart" => print_cart(session, out)?,
            "empty" => {
                session.empty_cart().await?;
                writeln!(out, "cart emptied")?;
            }
            "export" => {
                let pick_list = session.pick_list();
                if !pick_list.is_empty() {
                    writeln!(out, "{pick_list}")?;
                }
            }
            other => anyhow::bail!("unknown command: {other} (try `help`)"),
        }

        Ok(Flow::Continue)
    }

    fn print_view<W: Write>(&self, session: &Session, out: &mut W) -> anyhow::Result<()> {
        let view = session.view(&self.filter);
        writeln!(out, "# | {}", DISPLAY_HEADERS.join(" | "))?;
        for (position, item) in view.iter().enumerate() {
            writeln!(
                out,
                "{} | {}",
                position + 1,
                display_cells(item.row).join(" | ")
            )?;
        }
        writeln!(out, "{} rows", view.len())?;
        Ok(())
    }

    fn print_filter<W: Write>(&self, out: &mut W) -> anyhow::Result<()> {
        let filter = &self.filter;
        if let Some(search) = filter.active_search() {
            writeln!(out, "filter: search {search:?}")?;
            return Ok(());
        }

        let places = match &filter.places {
            Some(places) => places.iter().cloned().collect::<Vec<_>>().join(", "),
            None => "all".to_owned(),
        };
        let or_all = |value: Option<String>| value.unwrap_or_else(|| "all".to_owned());
        writeln!(
            out,
            "filter: place [{places}] row {} column {} subrow {}",
            or_all(filter.row.map(|n| n.to_string())),
            or_all(filter.column.map(|n| n.to_string())),
            or_all(filter.subrow.clone()),
        )?;
        Ok(())
    }
}

fn print_cart<W: Write>(session: &Session, out: &mut W) -> anyhow::Result<()> {
    let cart = session.cart();
    writeln!(out, "orig_idx | Titulo | Autor | Año | Lugar | Row | Column | Subrow")?;
    for row in cart.rows() {
        let opt = |value: &Option<String>| value.clone().unwrap_or_default();
        writeln!(
            out,
            "{} | {} | {} | {} | {} | {} | {} | {}",
            row.origin_index,
            row.title,
            opt(&row.author),
            opt(&row.year),
            row.place,
            opt(&row.row),
            opt(&row.column),
            opt(&row.subrow),
        )?;
    }
    writeln!(out, "{} in cart", cart.len())?;
    Ok(())
}

fn parse_places(session: &Session, raw: &str) -> anyhow::Result<BTreeSet<String>> {
    let known = session.catalogue().places();
    let mut places = BTreeSet::new();
    for place in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if !known.iter().any(|k| k == place) {
            anyhow::bail!("unknown place: {place:?} (known: {})", known.join(", "));
        }
        places.insert(place.to_owned());
    }
    if places.is_empty() {
        anyhow::bail!("place: expected one or more places, `all` or `default`");
    }
    Ok(places)
}

fn parse_number_or_all(raw: &str) -> anyhow::Result<Option<u32>> {
    match raw {
        "all" => Ok(None),
        _ => raw
            .parse::<u32>()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("expected a number or `all`, got {raw:?}")),
    }
}

fn parse_numbers<T: std::str::FromStr>(raw: &str) -> anyhow::Result<Vec<T>> {
    let numbers = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<T>()
                .map_err(|_| anyhow::anyhow!("expected a number, got {s:?}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    if numbers.is_empty() {
        anyhow::bail!("expected one or more numbers");
    }
    Ok(numbers)
}

/// `list` numbers rows from 1; the session takes 0-based positions.
fn parse_list_positions(raw: &str) -> anyhow::Result<Vec<usize>> {
    parse_numbers::<usize>(raw)
        .context("add")?
        .into_iter()
        .map(|n| {
            n.checked_sub(1)
                .ok_or_else(|| anyhow::anyhow!("add: rows are numbered from 1"))
        })
        .collect()
}

fn join_numbers(numbers: &[u32]) -> String {
    numbers
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
