use anyhow::{bail, Result};
use std::io;

use geoshare::config::Config;
use geoshare::logging::{log, obj, v_str, Domain, Level};
use geoshare::render::{render_session, TextRenderer};
use geoshare::session::{Session, SharedSession};
use geoshare::source::RestCountriesSource;

struct Args {
    json: bool,
    select: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        json: false,
        select: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--json" => args.json = true,
            "--select" => match it.next() {
                Some(name) => args.select = Some(name),
                None => bail!("--select requires a name"),
            },
            "-h" | "--help" => {
                println!("usage: geoshare [--json] [--select NAME]");
                std::process::exit(0);
            }
            other => bail!("unknown argument {:?}", other),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;
    let cfg = Config::from_env();
    let session = SharedSession::new(Session::from_config(&cfg)?);
    let source = RestCountriesSource::from_config(&cfg)?;

    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("source", v_str(source.endpoint().as_str())),
            ("window", v_str(&format!("[{}, {})", cfg.window_start, cfg.window_end))),
        ]),
    );

    session.refresh(&source).await;

    if let Some(name) = &args.select {
        // No click position on the command line; the controller re-resolves
        // the index from the name.
        session.select(name, 0);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    } else {
        let stdout = io::stdout();
        let mut renderer = TextRenderer::new(stdout.lock());
        session.with(|s| render_session(s, &mut renderer))?;
    }
    log(
        Level::Debug,
        Domain::Render,
        "rendered",
        obj(&[("format", v_str(if args.json { "json" } else { "text" }))]),
    );
    Ok(())
}
