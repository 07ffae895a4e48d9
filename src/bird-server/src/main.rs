use std::error::Error;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use bird_serve::{
    bootstrap, config, load_model, ArtifactRef, Fetcher, GraphSpec, ImageClassifier, LoadError,
};
use bird_server::Assets;
use log::info;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
struct ModelArgs {
    #[structopt(long, env = "BIRD_MODEL_URL", default_value = config::DEFAULT_MODEL_URL,
        help = "URL the model artifact is downloaded from")]
    model_url: String,

    #[structopt(long, env = "BIRD_MODEL_DIR", default_value = config::DEFAULT_MODEL_DIR,
        parse(from_os_str), help = "Directory the artifact is cached in")]
    model_dir: PathBuf,

    #[structopt(long, env = "BIRD_MODEL_FILE", default_value = config::DEFAULT_MODEL_FILE,
        help = "File name of the cached artifact")]
    model_file: String,

    #[structopt(long, default_value = config::DEFAULT_INPUT_OP, help = "Graph input operation")]
    input_op: String,

    #[structopt(long, default_value = config::DEFAULT_OUTPUT_OP, help = "Graph output operation")]
    output_op: String,

    #[structopt(long, help = "Side of the square model input")]
    input_size: Option<u32>,

    #[structopt(long, help = "Artifact download timeout in seconds")]
    fetch_timeout: Option<u64>,
}

impl ModelArgs {
    fn artifact(&self) -> ArtifactRef {
        ArtifactRef::new(&self.model_url, &self.model_dir, &self.model_file)
    }

    fn graph(&self) -> GraphSpec {
        GraphSpec {
            input_op: self.input_op.clone(),
            output_op: self.output_op.clone(),
            input_size: self.input_size.unwrap_or(config::DEFAULT_INPUT_SIZE),
        }
    }

    fn loader(&self) -> impl FnOnce(&Path) -> Result<ImageClassifier, LoadError> + Send + 'static {
        let graph = self.graph();
        let dir = self.model_dir.clone();
        let file_name = self.model_file.clone();

        move |_: &Path| load_model(&dir, &file_name, &graph)
    }

    fn fetcher(&self) -> Result<Fetcher, bird_serve::FetchError> {
        Fetcher::new(
            self.fetch_timeout
                .map(Duration::from_secs)
                .unwrap_or_else(config::default_fetch_timeout),
        )
    }
}

#[derive(StructOpt, Debug)]
#[structopt(
    name = "bird-server",
    about = "HTTP service classifying bird photos with TensorFlow"
)]
enum CmdArgs {
    /// Fetch and load the model, then serve classification requests
    Serve {
        #[structopt(flatten)]
        model: ModelArgs,

        #[structopt(long, env = "BIRD_HOST", default_value = "0.0.0.0")]
        host: IpAddr,

        #[structopt(long, env = "BIRD_PORT", default_value = "5000")]
        port: u16,

        #[structopt(long, env = "BIRD_ASSETS_DIR", default_value = "app", parse(from_os_str),
            help = "Directory holding view/index.html and static/")]
        assets_dir: PathBuf,
    },

    /// Fetch and load the model, then exit
    Prepare {
        #[structopt(flatten)]
        model: ModelArgs,
    },
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match CmdArgs::from_args() {
        CmdArgs::Serve {
            model,
            host,
            port,
            assets_dir,
        } => {
            bird_server::start(
                SocketAddr::new(host, port),
                &model.fetcher()?,
                &model.artifact(),
                Assets::new(&assets_dir),
                model.loader(),
                shutdown_signal(),
            )
            .await?;
        }
        CmdArgs::Prepare { model } => {
            bootstrap(&model.fetcher()?, &model.artifact(), model.loader()).await?;

            info!("Model {} is ready", model.artifact().local_path().display());
        }
    }

    Ok(())
}
