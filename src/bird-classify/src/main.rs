use std::error::Error;
use std::path::PathBuf;

use bird_serve::{classify_bytes, config, GraphSpec, ImageClassifier, ModelState, Timer, BIRD_SPECIES};
use log::info;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "bird-classify",
    about = "CLI app to classify a bird photo with an exported TensorFlow graph"
)]
struct CmdArgs {
    #[structopt(parse(from_os_str), help = "Path to the frozen model graph")]
    model: PathBuf,

    #[structopt(help = "Image file path or http(s) URL to fetch it from")]
    image: String,

    #[structopt(long, default_value = config::DEFAULT_INPUT_OP, help = "Graph input operation")]
    input_op: String,

    #[structopt(long, default_value = config::DEFAULT_OUTPUT_OP, help = "Graph output operation")]
    output_op: String,

    #[structopt(long, help = "Side of the square model input")]
    input_size: Option<u32>,
}

impl CmdArgs {
    fn graph(&self) -> GraphSpec {
        GraphSpec {
            input_op: self.input_op.clone(),
            output_op: self.output_op.clone(),
            input_size: self.input_size.unwrap_or(config::DEFAULT_INPUT_SIZE),
        }
    }
}

async fn read_image(source: &str) -> Result<Vec<u8>, Box<dyn Error>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let mut t = Timer::new_start(&format!("Fetching image from {}", source));
        let bytes = reqwest::get(source).await?.error_for_status()?.bytes().await?;
        t.stop();

        Ok(bytes.to_vec())
    } else {
        Ok(tokio::fs::read(source).await?)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = CmdArgs::from_args();

    let classifier = ImageClassifier::load(&args.model, &args.graph(), BIRD_SPECIES)?;
    let state = ModelState::new(classifier);

    let data = read_image(&args.image).await?;
    let prediction = classify_bytes(&state, &data)?;

    info!("Classified {} as {}", args.image, prediction.label);
    println!("{}", serde_json::to_string(&prediction)?);

    Ok(())
}
