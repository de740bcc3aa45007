//! Parse captured field bags into a scan document.
//!
//! Structured logging goes to stderr; use `RUST_LOG=debug` etc.

use std::{
	path::PathBuf,
	sync::{Arc, atomic::AtomicBool},
};

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use ie::{AvatarMatcher, Color, OwnedImage, PaddleOcr, TemplateMatcher};
use scanner::{
	CharacterBag, CharacterParser, Config, Context, Event, FieldBag, FilterSpec, LightConeStrategy, Notifier,
	ParseStrategy, RecordKind, RelicStrategy, Scanner, export,
};

#[derive(Parser)]
#[command(name = "parse_bag", version, about = "Parse captured field bags into an HSR-Scanner document")]
struct Args {
	/// Print the SRO optimizer format instead of the native document.
	#[arg(long)]
	sro: bool,

	/// Scanner configuration (JSON).
	#[arg(value_name = "CONFIG")]
	config: PathBuf,

	/// What the bags hold.
	#[arg(value_enum)]
	kind: KindArg,

	/// Bag files, in display order.
	#[arg(value_name = "BAG", required = true)]
	bags: Vec<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
	Relic,
	#[value(name = "light_cone")]
	LightCone,
	Character,
}

fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_writer(std::io::stderr)
		.init();

	let args = Args::parse();
	let config = Config::load(&args.config)?;

	let catalog = Arc::new(config.load_catalog()?);
	let models = config.ocr.as_ref().context("config has no OCR models")?;
	let recognizer = PaddleOcr::try_new(&models.detection, &models.recognition, &models.charset)?;
	let owners = AvatarMatcher::new(catalog.mini_icons(), catalog.character_keys())?;
	tracing::info!(icons = owners.len(), "loaded avatar icons");
	let lock_icon = match (&config.lock_icon, args.kind) {
		(Some(path), _) => OwnedImage::open(path)?,
		// the roster has no lock flag
		(None, KindArg::Character) => OwnedImage::filled(0, 0, Color::BLACK),
		(None, _) => anyhow::bail!("config has no lock_icon"),
	};

	let (notifier, rx) = Notifier::channel(config.debug);
	let interrupt = Arc::new(AtomicBool::new(false));
	let ctx = Context {
		catalog: catalog.clone(),
		recognizer: Arc::new(recognizer),
		matcher: Arc::new(TemplateMatcher),
		owners: Arc::new(owners),
		lock_icon: Arc::new(lock_icon),
		notifier: notifier.clone(),
		interrupt: interrupt.clone(),
	};
	let scanner = Scanner::new(notifier, interrupt);

	let doc = match args.kind {
		KindArg::Character => {
			let bags = args.bags.iter().map(CharacterBag::load).collect::<Result<Vec<_>>>()?;
			let mut parser = CharacterParser::new(ctx);
			if let Some(icons) = config.trailblazer_icons()? {
				parser = parser.with_trailblazer_icons(icons);
			}
			tracing::info!(bags = bags.len(), "scanning roster");
			let records = scanner.scan_characters(&parser, bags, &config.filters.character)?;
			export::ScanDocument::new(None, Vec::new()).with_characters(records)
		}
		KindArg::Relic | KindArg::LightCone => {
			let kind = match args.kind {
				KindArg::Relic => RecordKind::Relic,
				_ => RecordKind::LightCone,
			};
			let bags = args.bags.iter().map(FieldBag::load).collect::<Result<Vec<_>>>()?;
			let strategy: Box<dyn ParseStrategy> = match kind {
				RecordKind::Relic => {
					let discard_icon =
						OwnedImage::open(config.discard_icon.as_ref().context("config has no discard_icon")?)?;
					Box::new(RelicStrategy::new(ctx, discard_icon))
				}
				RecordKind::LightCone => Box::new(LightConeStrategy::new(ctx)),
			};

			let filters = config.filters.for_kind(kind);
			let scanner = scanner.with_mode(config.scan_mode(kind));
			let sort = scanner.sort_method(strategy.as_ref(), &FilterSpec::parse(filters)?);
			tracing::info!(sort = sort.label(), bags = bags.len(), "scanning");
			let records = scanner.scan_inventory(strategy.as_ref(), bags, filters, sort)?;
			export::ScanDocument::new(None, records)
		}
	};

	let mut progress = 0;
	for event in rx.try_iter() {
		match event {
			Event::Log { message, level } => eprintln!("[{level:?}] {message}"),
			Event::Progress(increment) => {
				tracing::trace!(?increment, "progress");
				progress += 1;
			}
		}
	}
	tracing::info!(
		relics = doc.relics.len(),
		light_cones = doc.light_cones.len(),
		characters = doc.characters.len(),
		progress_events = progress,
		"done"
	);

	let out = if args.sro {
		serde_json::to_string_pretty(&export::to_sro(&doc, catalog.key_map()?)?)?
	} else {
		serde_json::to_string_pretty(&doc)?
	};
	println!("{out}");
	Ok(())
}
