use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use speech_demo::{
    engines::onnx::{OnnxModelLoader, OnnxModelParamsBuilder},
    text::SAMPLE_PARAGRAPHS,
    Pipeline, ProgressReporter, SpeechError,
};

/// Text progress bar on stderr.
struct ConsoleProgress {
    status: String,
}

impl ProgressReporter for ConsoleProgress {
    fn report(&mut self, percent: u8, status: Option<&str>) {
        if let Some(status) = status {
            self.status = status.to_string();
        }
        let filled = percent as usize / 5;
        eprint!(
            "\r[{}{}] {:>3}% {:<28}",
            "#".repeat(filled),
            " ".repeat(20 - filled),
            percent,
            self.status
        );
        if percent == 100 {
            eprintln!();
        }
        let _ = std::io::stderr().flush();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let model_dir = std::env::var("SPEECH_MODEL_DIR").unwrap_or_else(|_| "pretrained_models".into());
    let output = std::env::var("SPEECH_OUTPUT").unwrap_or_else(|_| "output.wav".into());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let text = if args.is_empty() {
        println!("No text given, using a sample paragraph. Other samples:");
        for sample in &SAMPLE_PARAGRAPHS[1..] {
            println!("  {sample}");
        }
        SAMPLE_PARAGRAPHS[0].to_string()
    } else {
        args.join(" ")
    };

    let params = OnnxModelParamsBuilder::default().build()?;
    let pipeline = Pipeline::new(OnnxModelLoader::with_params(PathBuf::from(&model_dir), params));

    let load_start = Instant::now();
    pipeline.load_models()?;
    println!("Models loaded in {:.2?}", load_start.elapsed());

    let mut progress = ConsoleProgress {
        status: String::new(),
    };
    let artifact = match pipeline.run(&text, &mut progress) {
        Ok(artifact) => artifact,
        Err(e @ SpeechError::Validation(_)) => {
            eprintln!("{}", e.user_message());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let clip = artifact.decode()?;
    artifact.write_wav(&PathBuf::from(&output))?;
    println!(
        "Saved {:.2}s of audio at {} Hz to {output}",
        clip.duration_secs(),
        clip.sample_rate()
    );

    Ok(())
}
