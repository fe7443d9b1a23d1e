use story_gen_core::config::AppConfig;
use story_gen_core::export::export_text;
use story_gen_core::model::backend::{ModelInit, ModelStatus};
use story_gen_core::model::generator::Generator;
use story_gen_core::model::request::{
    Emotion, GenerationRequest, Genre, Kind, PoemStyle, Rhyme, WritingStyle,
};
use story_gen_core::store::{Collection, Store};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Load "config.json" (or $STORY_GEN_CONFIG), created with defaults if missing
    let config = AppConfig::load_or_init(AppConfig::default_path())?;

    // The model is selected once: primary endpoint, then mirror, then fallback model
    let init = ModelInit::load(&config.model)?;
    match init.status() {
        ModelStatus::Loaded { model, source } => println!("Model '{model}' loaded ({source:?})"),
        ModelStatus::Fallback { model, reason } => println!("Using fallback model '{model}': {reason}"),
    }
    let generator = Generator::new(init.into_generator());

    // History and favorites live in the data directory
    let mut store = Store::from_config(&config);

    // A story with a genre, a writing style and a main character
    let mut story = GenerationRequest::story("公主，城堡，龙", Genre::Fantasy);
    story.tone.writing_style = Some(WritingStyle::Classical);
    story.tone.character = Some("勇敢的骑士".to_owned());
    story.set_max_length(300)?;
    story.set_temperature(0.7)?;

    // Invalid temperatures are refused
    match story.set_temperature(1.5) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("Temperature 1.5 refused: {e}"),
    }

    let content = generator.generate(&story);
    println!("Story:\n{content}\n");
    store.record_generation(&story, &content);

    // A poem with rhyme and emotion
    let mut poem = GenerationRequest::poem("春天，花朵，希望", PoemStyle::Modern);
    poem.tone.rhyme = Some(Rhyme::EvenLines);
    poem.tone.emotion = Some(Emotion::Joy);

    // `try_generate` keeps the raw output next to the cleaned one
    match generator.try_generate(&poem) {
        Ok(text) => {
            println!("Raw poem:\n{}\n", text.raw);
            println!("Poem:\n{}\n", text.cleaned);
            store.record_generation(&poem, &text.cleaned);
            store.add_favorite(&text.cleaned, Some(Kind::Poem))?;
        }
        Err(e) => println!("Poem generation failed: {e}"),
    }

    // Latin keywords are rejected before the model is called
    let english = GenerationRequest::poem("spring flowers", PoemStyle::Classical);
    println!("Rejected: {}\n", generator.generate(&english));

    // Favorites need content
    if store.add_favorite("   ", None).is_err() {
        println!("Empty content cannot be added to favorites");
    }

    // The most recent history entries
    for entry in store.entries(Collection::History).iter().rev().take(5) {
        println!(
            "{} [{}] {}",
            entry.title,
            entry.genre_or_style().unwrap_or("-"),
            entry.content.lines().next().unwrap_or_default()
        );
    }
    println!("{} favorite(s)", store.entries(Collection::Favorites).len());

    // Export the story as a timestamped text file
    if let Some(path) = export_text(config.export_dir(), &content)? {
        println!("Story exported to {}", path.display());
    }

    Ok(())
}
