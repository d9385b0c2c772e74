use ai_styler_core::{
    config::Config,
    download,
    init,
    prompt::{
        BlurLevel, HexColor, Portrait, PortraitBackground, PortraitStyle, ShadingLevel, Sticker,
        StickerBackground, StickerStyle, StyleCatalog, WatercolorVariant,
    },
    settings::{AVAILABLE_MODELS, MAX_CANDIDATES},
    Controller, GenerationTicket, Settings, Styler,
};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Override the model from settings and .env
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Parallel candidates per generation (1-4)
    #[arg(short, long, global = true)]
    candidates: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Turn a photo into a stylised portrait
    Portrait {
        #[command(flatten)]
        style: PortraitArgs,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Turn a photo into a sticker
    Sticker {
        #[command(flatten)]
        style: StickerArgs,
        #[command(flatten)]
        run: RunArgs,
    },
    /// List the styles of both catalogs
    Styles,
    /// Show or change persisted settings
    Settings(SettingsArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// PNG or JPEG photo to restyle
    #[arg(required_unless_present = "print_prompt")]
    image: Option<PathBuf>,

    /// Directory for the downloaded image (defaults to settings, then cwd)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Save every candidate instead of only the selected one
    #[arg(long)]
    all: bool,

    /// Candidate to save, 1-based
    #[arg(long, default_value_t = 1)]
    select: usize,

    /// Print the composed prompt and exit without calling the model
    #[arg(long)]
    print_prompt: bool,
}

#[derive(Args, Debug)]
struct PortraitArgs {
    #[arg(short, long, default_value = "ghibli")]
    style: PortraitStyle,

    /// Shading for sketches; implies --style sketch
    #[arg(long)]
    shading: Option<ShadingLevel>,

    /// original | solid
    #[arg(long, default_value = "original")]
    background: PortraitBackground,

    /// Solid background colour, e.g. #FFAA00
    #[arg(long)]
    color: Option<HexColor>,
}

#[derive(Args, Debug)]
struct StickerArgs {
    #[arg(short, long, default_value = "cartoon")]
    style: StickerStyle,

    /// Shading for sketches; implies --style sketch
    #[arg(long)]
    shading: Option<ShadingLevel>,

    /// Blur for black-and-white; implies --style black-and-white
    #[arg(long)]
    blur: Option<BlurLevel>,

    /// Watercolor variant; implies --style watercolor
    #[arg(long)]
    watercolor: Option<WatercolorVariant>,

    /// Line thickness, 0.5 to 5.0
    #[arg(long, default_value_t = 3.0)]
    thickness: f32,

    /// keep | transparent
    #[arg(long, default_value = "keep")]
    background: StickerBackground,

    /// Outline distance 0 to 5, only with a transparent background
    #[arg(long, default_value_t = 0.0)]
    outline: f32,
}

#[derive(Args, Debug)]
struct SettingsArgs {
    /// Preferred model
    #[arg(long)]
    set_model: Option<String>,

    /// Default download directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Default candidate count (1-4)
    #[arg(long)]
    set_candidates: Option<usize>,

    /// Regenerate whenever a selection changes
    #[arg(long)]
    auto_regenerate: Option<bool>,
}

impl PortraitArgs {
    fn apply(&self, controller: &mut Controller<Portrait>) -> Option<GenerationTicket<Portrait>> {
        let mut ticket = controller.set_style(self.style);
        if let Some(level) = self.shading {
            ticket = controller.set_shading(level).or(ticket);
        }
        ticket = controller.set_background(self.background).or(ticket);
        if let Some(color) = &self.color {
            ticket = controller.set_background_color(color.clone()).or(ticket);
        }
        ticket
    }
}

impl StickerArgs {
    fn apply(&self, controller: &mut Controller<Sticker>) -> Option<GenerationTicket<Sticker>> {
        let mut ticket = controller.set_style(self.style);
        if let Some(level) = self.shading {
            ticket = controller.set_shading(level).or(ticket);
        }
        if let Some(level) = self.blur {
            ticket = controller.set_blur(level).or(ticket);
        }
        if let Some(variant) = self.watercolor {
            ticket = controller.set_watercolor(variant).or(ticket);
        }
        ticket = controller.set_thickness(self.thickness).or(ticket);
        ticket = controller.set_background(self.background).or(ticket);
        controller.set_outline(self.outline).or(ticket)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup
    let _ = dotenvy::dotenv();
    init();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load();
    tracing::debug!(?settings, "loaded settings");

    match cli.command {
        Command::Styles => {
            print_styles::<Portrait>();
            print_styles::<Sticker>();
            Ok(())
        }
        Command::Settings(args) => update_settings(&mut settings, args),
        Command::Portrait { style, run } => {
            let mut controller = Controller::<Portrait>::new().with_auto_regenerate(settings.auto_regenerate);
            if run.print_prompt {
                style.apply(&mut controller);
                return print_prompt(&controller);
            }
            let styler = connect(&settings, &cli.model, cli.candidates)?;
            load_source(&mut controller, &run)?;
            let ticket = style.apply(&mut controller);
            generate(controller, ticket, &run, &settings, &styler).await
        }
        Command::Sticker { style, run } => {
            let mut controller = Controller::<Sticker>::new().with_auto_regenerate(settings.auto_regenerate);
            if run.print_prompt {
                style.apply(&mut controller);
                return print_prompt(&controller);
            }
            let styler = connect(&settings, &cli.model, cli.candidates)?;
            load_source(&mut controller, &run)?;
            let ticket = style.apply(&mut controller);
            generate(controller, ticket, &run, &settings, &styler).await
        }
    }
}

fn print_styles<C: StyleCatalog>() {
    println!("{} styles:", C::NAME);
    for style in C::styles() {
        let marker = if *style == C::default_style() { " (default)" } else { "" };
        println!("  {}{}", style, marker);
    }
}

fn print_prompt<C: StyleCatalog>(controller: &Controller<C>) -> Result<()> {
    let style = controller.style().unwrap_or_else(C::default_style);
    println!("{}", C::compose(style, controller.modifiers()));
    Ok(())
}

/// Loads configuration before any other work so a missing key fails first.
/// The model flag beats settings, which beat the environment.
fn connect(settings: &Settings, model: &Option<String>, candidates: Option<usize>) -> Result<Styler> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(m) = model.clone().or_else(|| settings.model.clone()) {
        config.model_name = m;
    }

    let mut policy = settings.policy();
    if let Some(n) = candidates {
        policy.candidates = n.clamp(1, MAX_CANDIDATES);
    }

    tracing::debug!(model = %config.model_name, candidates = policy.candidates, "configured generation");
    Styler::with_config(config, policy).context("Failed to create Gemini client")
}

fn load_source<C: StyleCatalog>(controller: &mut Controller<C>, run: &RunArgs) -> Result<()> {
    let Some(path) = &run.image else {
        bail!("An image path is required");
    };
    controller
        .upload_file(path)
        .with_context(|| format!("Failed to load {}", path.display()))
}

async fn generate<C: StyleCatalog>(
    mut controller: Controller<C>,
    ticket: Option<GenerationTicket<C>>,
    run: &RunArgs,
    settings: &Settings,
    styler: &Styler,
) -> Result<()> {
    let ticket = match ticket {
        Some(ticket) => ticket,
        None => controller.start_generation().context("Cannot start generation")?,
    };

    // Send to API
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.green} {msg}")?,
    );
    spinner.set_message(format!(
        "Generating {} candidate(s) with {}...",
        styler.orchestrator().policy().candidates,
        styler.config().model_id()
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));

    styler.fulfil(&mut controller, ticket).await;

    spinner.finish_and_clear();

    if let Some(error) = controller.error() {
        bail!("{error}");
    }

    let result = controller.result();
    println!("Generated {} candidate(s):", result.len());
    for (i, image) in result.images().iter().enumerate() {
        println!("  {}. {} (~{} KiB)", i + 1, image.mime_type, image.approx_len() / 1024);
    }

    if run.select == 0 || run.select > result.len() {
        bail!("--select must be between 1 and {}", result.len());
    }
    controller.select_candidate(run.select - 1);

    let dir = run.out.clone().unwrap_or_else(|| settings.output_dir());
    let now = Utc::now();
    if run.all {
        for path in download::save_all(controller.result(), &dir, now).context("Failed to save images")? {
            println!("Saved {}", path.display());
        }
    } else {
        let path = download::save_selected(controller.result(), &dir, now).context("Failed to save image")?;
        println!("Saved {}", path.display());
    }

    Ok(())
}

fn update_settings(settings: &mut Settings, args: SettingsArgs) -> Result<()> {
    let changed = args.set_model.is_some()
        || args.output_dir.is_some()
        || args.set_candidates.is_some()
        || args.auto_regenerate.is_some();

    if let Some(model) = args.set_model {
        if !AVAILABLE_MODELS.contains(&model.as_str()) {
            eprintln!("Warning: {} is not a known image model", model);
        }
        settings.model = Some(model);
    }
    if let Some(dir) = args.output_dir {
        settings.output_dir = Some(dir);
    }
    if let Some(n) = args.set_candidates {
        settings.candidates = n;
    }
    if let Some(enabled) = args.auto_regenerate {
        settings.auto_regenerate = enabled;
    }

    if changed {
        *settings = settings.clone().normalized();
        settings.save().context("Failed to save settings")?;
    }

    match Settings::config_path() {
        Some(path) => println!("Settings ({}):", path.display()),
        None => println!("Settings:"),
    }
    println!("  model:           {}", settings.model.as_deref().unwrap_or("(from environment)"));
    println!("  output dir:      {}", settings.output_dir().display());
    println!("  candidates:      {}", settings.candidates);
    println!("  auto-regenerate: {}", settings.auto_regenerate);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sticker_flags() {
        let cli = Cli::parse_from([
            "ai-styler", "--candidates", "2", "sticker", "me.jpg", "--style", "watercolor",
            "--watercolor", "vibrant", "--background", "transparent", "--outline", "3",
        ]);
        assert_eq!(cli.candidates, Some(2));
        let Command::Sticker { style, run } = cli.command else {
            panic!("expected sticker command");
        };
        assert_eq!(style.style, StickerStyle::Watercolor);
        assert_eq!(style.watercolor, Some(WatercolorVariant::Vibrant));
        assert_eq!(style.background, StickerBackground::Transparent);
        assert_eq!(run.image, Some(PathBuf::from("me.jpg")));
        assert_eq!(run.select, 1);
    }

    #[test]
    fn shading_flag_selects_sketch() {
        let cli = Cli::parse_from(["ai-styler", "portrait", "me.png", "--shading", "heavy"]);
        let Command::Portrait { style, .. } = cli.command else {
            panic!("expected portrait command");
        };
        let mut controller = Controller::<Portrait>::new();
        assert!(style.apply(&mut controller).is_none());
        assert_eq!(controller.style(), Some(PortraitStyle::Sketch));
        assert_eq!(controller.modifiers().shading, ShadingLevel::Heavy);
    }

    #[test]
    fn image_is_optional_only_when_printing_the_prompt() {
        let cli = Cli::parse_from(["ai-styler", "sticker", "--print-prompt", "--style", "pixar"]);
        let Command::Sticker { run, .. } = cli.command else {
            panic!("expected sticker command");
        };
        assert!(run.print_prompt);
        assert!(run.image.is_none());

        assert!(Cli::try_parse_from(["ai-styler", "sticker", "--style", "pixar"]).is_err());
    }

    #[test]
    fn missing_key_fails_before_reading_the_image() {
        // SAFETY: no other test in this binary reads these variables.
        unsafe {
            std::env::remove_var("GEMINI_API_KEY");
            std::env::remove_var("API_KEY");
        }
        let err = connect(&Settings::default(), &None, None).err().unwrap();
        assert!(format!("{err:#}").contains("GEMINI_API_KEY"));
    }

    #[test]
    fn rejects_unknown_style() {
        assert!(Cli::try_parse_from(["ai-styler", "portrait", "me.png", "--style", "cubism"]).is_err());
    }
}
