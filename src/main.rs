use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::io::{self, BufRead};
use std::str::FromStr;
use std::sync::Arc;

use fabula::{
    badge_class, flavor_options, page_size_options, presentation_for, ApiEndpoints, Config,
    Document, DomEvent, Pager, PlayPolicy, PlaybackController, PlayerView, SelectView,
    SelectWidget, SimulatedMediaElement, StoryFlavor, DEFAULT_PAGE_SIZE,
};

const HELP: &str = "\
commands:
  flavor|size open|close|toggle|select <value>
  click outside|flavor|size [<option index>]
  key <name>                 e.g. key Escape
  play | toggle              toggle playback
  seek <seconds>             seek through the range control
  volume <0..1>
  load <duration>            metadata arrives for the current source
  tick <seconds>             let the clock run
  media-key play|pause       transport change from outside the page
  policy allow|reject|defer  how play requests are answered
  resolve allow|reject       settle a deferred play request
  src <path>                 switch narration source
  status <code>              show the badge for a lifecycle code
  page next|prev | total <n>
  show | help | quit";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    flavor: SelectView<StoryFlavor>,
    page_size: SelectView<u64>,
    page: String,
    archive_url: String,
    player: PlayerView,
}

/// One page worth of widgets plus a narration player, driven line by line.
struct Console {
    document: Document,
    endpoints: ApiEndpoints,
    flavor: SelectWidget<StoryFlavor>,
    page_size: SelectWidget<u64>,
    pager: Arc<Mutex<Pager>>,
    element: Arc<SimulatedMediaElement>,
    player: Arc<Mutex<PlaybackController<SimulatedMediaElement>>>,
}

impl Console {
    fn new(config: &Config) -> Result<Self> {
        let document = Document::new();
        let endpoints = config.endpoints();
        let pager = Arc::new(Mutex::new(Pager::new(DEFAULT_PAGE_SIZE)));

        let flavor = SelectWidget::new(
            &document,
            document.body(),
            flavor_options(),
            StoryFlavor::default(),
        )
        .on_change(|flavor| log::info!("Flavor selected: {}", flavor.label()));

        let pager_for_size = Arc::clone(&pager);
        let page_size = SelectWidget::new(
            &document,
            document.body(),
            page_size_options(),
            DEFAULT_PAGE_SIZE,
        )
        .on_change(move |size| {
            pager_for_size.lock().set_page_size(*size);
            log::info!("Page size set to {}", size);
        });

        let src = endpoints
            .file_url("files/audio/sample.mp3")
            .context("Failed to resolve narration URL")?;
        let element = Arc::new(SimulatedMediaElement::new());
        let player = PlaybackController::new(Arc::clone(&element), &src);
        player.set_volume(config.initial_volume);
        log::info!("Narration source: {}", src);

        Ok(Self {
            document,
            endpoints,
            flavor,
            page_size,
            pager,
            element,
            player: Arc::new(Mutex::new(player)),
        })
    }

    fn run(&self, words: &[&str]) -> Result<()> {
        match words {
            ["help"] => println!("{}", HELP),
            ["show"] => {}
            ["flavor", args @ ..] => drive_select(&self.flavor, args)?,
            ["size", args @ ..] => drive_select(&self.page_size, args)?,
            ["click", "outside"] => self.click(self.document.body()),
            ["click", "flavor"] => self.click(self.flavor.trigger_node()),
            ["click", "size"] => self.click(self.page_size.trigger_node()),
            ["click", "flavor", index] => {
                let node = self
                    .flavor
                    .option_node(parse_arg(index)?)
                    .context("Flavor menu is closed or has no such option")?;
                self.click(node);
            }
            ["click", "size", index] => {
                let node = self
                    .page_size
                    .option_node(parse_arg(index)?)
                    .context("Page size menu is closed or has no such option")?;
                self.click(node);
            }
            ["key", key] => {
                self.document.dispatch(&DomEvent::key_down(*key));
            }
            ["play"] | ["toggle"] => self.player.lock().toggle_playback(),
            ["seek", seconds] => self.player.lock().seek_from_range(parse_arg(seconds)?),
            ["volume", volume] => self.player.lock().set_volume(parse_arg(volume)?),
            ["load", duration] => self.element.load_metadata(parse_arg(duration)?),
            ["tick", seconds] => self.element.advance(parse_arg(seconds)?),
            ["media-key", "play"] => self.element.external_play(),
            ["media-key", "pause"] => self.element.external_pause(),
            ["policy", policy] => self.element.set_play_policy(parse_policy(policy)?),
            ["resolve", "allow"] => self.element.resolve_pending_play(true),
            ["resolve", "reject"] => self.element.resolve_pending_play(false),
            ["src", path] => {
                let url = self
                    .endpoints
                    .file_url(path)
                    .context("Empty narration path")?;
                self.player.lock().set_source(&url);
            }
            ["status", code] => {
                let presentation = serde_json::to_string(&presentation_for(code))
                    .context("Failed to encode status")?;
                println!("{} {}", badge_class(code), presentation);
            }
            ["page", "next"] => self.pager.lock().next(),
            ["page", "prev"] => self.pager.lock().prev(),
            ["total", total] => self.pager.lock().set_total(parse_arg(total)?),
            _ => bail!("unknown command, try `help`"),
        }
        Ok(())
    }

    fn click(&self, target: fabula::NodeId) {
        self.document.dispatch(&DomEvent::pointer_down(target));
    }

    fn print(&self) -> Result<()> {
        let pager = *self.pager.lock();
        let snapshot = Snapshot {
            flavor: self.flavor.view(),
            page_size: self.page_size.view(),
            page: pager.label(),
            archive_url: self
                .endpoints
                .stories(pager.page(), pager.page_size())?
                .to_string(),
            player: self.player.lock().view(),
        };

        println!(
            "{}",
            serde_json::to_string(&snapshot).context("Failed to encode snapshot")?
        );
        Ok(())
    }
}

fn drive_select<T>(widget: &SelectWidget<T>, args: &[&str]) -> Result<()>
where
    T: FromStr + Clone + PartialEq + Send + 'static,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match args {
        ["open"] => widget.open(),
        ["close"] => widget.close(),
        ["toggle"] => widget.toggle(),
        ["select", value] => widget.select_option(parse_arg(value)?),
        _ => bail!("expected open, close, toggle or select <value>"),
    }
    Ok(())
}

fn parse_arg<T>(raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .with_context(|| format!("Invalid argument {:?}", raw))
}

fn parse_policy(raw: &str) -> Result<PlayPolicy> {
    match raw {
        "allow" => Ok(PlayPolicy::Allow),
        "reject" => Ok(PlayPolicy::Reject),
        "defer" => Ok(PlayPolicy::Defer),
        other => bail!("unknown play policy {:?}", other),
    }
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting fabula console");

    let config = Config::from_env().context("Failed to load configuration")?;
    log::info!("Story service at {}", config.api_base_url);

    let console = Console::new(&config)?;

    // Detach the player before exiting on Ctrl+C
    let player_for_signal = Arc::clone(&console.player);
    ctrlc::set_handler(move || {
        log::info!("Received interrupt signal (Ctrl+C), detaching player...");
        player_for_signal.lock().teardown();
        std::process::exit(0);
    })
    .context("Failed to set Ctrl+C handler")?;

    console.print()?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read command")?;
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        if matches!(words[0], "quit" | "exit") {
            break;
        }

        if let Err(e) = console.run(&words) {
            log::warn!("{}: {:#}", line.trim(), e);
            continue;
        }

        let delivered = console.element.flush();
        if delivered > 0 {
            log::debug!("Delivered {} media events", delivered);
        }
        console.print()?;
    }

    console.player.lock().teardown();
    log::info!("Console closed");
    Ok(())
}
