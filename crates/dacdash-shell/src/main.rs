//! dacdash — DAC dashboard navigation core, driven from the terminal.
//! Entry point for the shell binary.
//!
//! Each stdin line is one user intent. Lines starting with `#` are typed
//! into the simulated address bar; everything else is a command.

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dacdash_data::MemoryDataPort;
use dacdash_nav::controller::HashChange;
use dacdash_nav::{CuratorPanel, DashboardSession, MemoryAddressBar, Mode, NavExtras, OrgForm, View};

const HELP: &str = "\
commands:
  #<fragment>            type a fragment into the address bar
  nav <view> [org]       navigate to a view
  tab <view>             switch tab, keeping the org on company/map
  select <org>           pick an organisation
  search <text>          search in the finder (empty clears)
  find                   list finder results for the current route
  mode read|curator      switch mode
  brief <org> | back     open or leave the brief
  link <view> [org]      shareable link with the current state
  panel <kind> [claim]   open a curator panel for the selected org
  submit <json>          submit the open panel
  dismiss                close the open panel
  add-org <json>         add an organisation
  drafts                 list outstanding drafts
  approve <id>           approve a draft
  reject <id>            reject a draft
  ask <question>         ask about the selected org
  cite <index>           propose a relation from an answer citation
  reload | state | help | quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dacdash=debug,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("dacdash starting up, version {}", env!("CARGO_PKG_VERSION"));

    let config = match config::Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!("Could not load dacdash.toml: {e}");
            warn!("Running with built-in defaults.");
            config::Config::default()
        }
    };

    let mut port = if config.data.seed { MemoryDataPort::seeded() } else { MemoryDataPort::empty() };
    if config.data.latency_ms > 0 {
        port = port.with_latency(Duration::from_millis(config.data.latency_ms));
    }
    let port = Arc::new(port);

    let (bar, mut changes) = MemoryAddressBar::new(config.shell.initial_fragment.as_str());
    let session = DashboardSession::new(port.clone(), bar.clone(), config.shell.base_url.clone());

    let outcome = session.load(port.as_ref()).await;
    info!(
        outcome = ?outcome,
        entities = session.snapshot().dossiers.len(),
        "Collection loaded"
    );
    print_state(&session, config.shell.print_state)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }

        if line.starts_with('#') {
            bar.user_edit(line);
        } else if let Err(e) = run_command(&session, &port, line).await {
            println!("error: {e:#}");
        }

        drain(&session, &mut changes);
        print_state(&session, config.shell.print_state)?;
    }

    session.close();
    info!("dacdash shutting down");
    Ok(())
}

fn drain(session: &DashboardSession, changes: &mut mpsc::UnboundedReceiver<HashChange>) {
    let handled = session.drain(changes);
    if handled > 0 {
        tracing::debug!(handled, "Address bar notifications processed");
    }
}

fn print_state(session: &DashboardSession, enabled: bool) -> anyhow::Result<()> {
    if enabled {
        println!("{}", serde_json::to_string_pretty(&session.view())?);
    }
    Ok(())
}

fn parse_view(name: &str) -> anyhow::Result<View> {
    View::parse(name).with_context(|| format!("unknown view '{name}'"))
}

fn selected(session: &DashboardSession) -> anyhow::Result<String> {
    session.selected_id().context("no organisation selected")
}

async fn run_command(session: &DashboardSession, port: &Arc<MemoryDataPort>, line: &str) -> anyhow::Result<()> {
    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    };
    let mut args = rest.split_whitespace();

    match cmd {
        "help" => println!("{HELP}"),
        "state" => print_state(session, true)?,
        "nav" => {
            let view = parse_view(args.next().unwrap_or_default())?;
            let outcome = session.navigate(view, args.next(), NavExtras::new());
            println!("{outcome:?}");
        }
        "tab" => {
            let view = parse_view(rest)?;
            println!("{:?}", session.select_tab(view));
        }
        "select" => {
            session.select_company(rest);
        }
        "search" => {
            session.search(rest);
        }
        "find" => {
            for org in session.finder_results().await? {
                println!("{} {} ({})", org.id, org.name, org.stage.label());
            }
        }
        "mode" => {
            let mode = match rest {
                "curator" => Mode::Curator,
                "read"    => Mode::Read,
                other     => anyhow::bail!("unknown mode '{other}'"),
            };
            session.set_mode(mode);
        }
        "brief" => {
            let id = if rest.is_empty() { selected(session)? } else { rest.to_string() };
            session.open_brief(&id);
        }
        "back" => {
            session.back_from_brief();
        }
        "link" => {
            let view = parse_view(args.next().unwrap_or_default())?;
            println!("{}", session.link_with_state(view, args.next()));
        }
        "panel" => {
            let kind = args.next().unwrap_or_default();
            let org = selected(session)?;
            let panel = CuratorPanel::from_parts(kind, &org, args.next())?;
            if !session.open_panel(panel) {
                println!("panels open in curator mode only");
            }
        }
        "submit" => {
            let raw: Value = serde_json::from_str(rest).context("submit expects a JSON object")?;
            let draft_id = session.submit(raw).await?;
            println!("draft {draft_id}");
        }
        "dismiss" => session.dismiss_panel(),
        "add-org" => {
            if !session.open_org_panel() {
                anyhow::bail!("adding organisations needs curator mode");
            }
            let form: OrgForm = serde_json::from_str(rest).context("add-org expects a JSON object")?;
            let id = session.add_organization(form).await?;
            println!("added {id}");
        }
        "drafts" => {
            for draft in session.open_drafts().await? {
                println!("{} {:?} {}", draft.id, draft.kind, draft.payload);
            }
        }
        "approve" => session.approve(rest).await?,
        "reject" => session.reject(rest)?,
        "ask" => {
            let answer = session.ask(rest).await?;
            println!("{}", answer.answer);
            for (i, citation) in answer.citations.iter().enumerate() {
                println!("  [{i}] {} {}", citation.title.as_deref().unwrap_or("-"), citation.url);
            }
        }
        "cite" => {
            let index: usize = rest.parse().context("cite expects a citation index")?;
            let draft_id = session.propose_relation(index).await?;
            println!("draft {draft_id}");
        }
        "reload" => {
            let outcome = session.load(port.as_ref()).await;
            println!("{outcome:?}");
        }
        other => anyhow::bail!("unknown command '{other}' (try 'help')"),
    }
    Ok(())
}
