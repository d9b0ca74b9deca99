use clap::Parser;
use recrutime_context::text::{DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP, ParagraphChunker};
use recrutime_context::tokenize;
use serde::Serialize;
use std::fs;
use std::io::{self, Read};

/// A CLI tool to chunk knowledge documents into JSON output using recrutime-context.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Document path, relative to the knowledge root, used in chunk ids.
    #[arg(short, long, default_value = "stdin.txt")]
    path: String,

    /// Maximum length for each text chunk, in characters.
    #[arg(short, long, default_value_t = DEFAULT_CHUNK_SIZE)]
    max_chunk_length: usize,

    /// Characters shared by consecutive slices of an oversized paragraph.
    #[arg(short, long, default_value_t = DEFAULT_OVERLAP)]
    overlap: usize,
}

#[derive(Serialize)]
struct SerializableTextChunk<'a> {
    chunk_id: String,
    sequence: usize,
    chars: usize,
    tokens: usize,
    chunk_text: &'a str,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let file_content = if let Some(input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let chunker = ParagraphChunker::new(args.path, args.max_chunk_length, args.overlap);
    let chunks = chunker.get_chunks(&file_content);

    let serializable_chunks: Vec<SerializableTextChunk> = chunks
        .iter()
        .map(|c| SerializableTextChunk {
            chunk_id: c.chunk_id(),
            sequence: c.sequence,
            chars: c.char_len(),
            tokens: tokenize(&c.chunk_text).len(),
            chunk_text: &c.chunk_text,
        })
        .collect();

    let json_output = serde_json::to_string_pretty(&serializable_chunks)?;
    println!("{json_output}");

    Ok(())
}
