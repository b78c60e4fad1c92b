// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// shaver: render PDF pages to image files.

mod pages;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use shaver_core::ShaverConfig;
use shaver_document::{DocumentEngine, RasterCodec};
use shaver_host::{Document, RenderOptions, Session};

use crate::pages::{PAGE_PLACEHOLDER, PageSelection, output_path, parse_selection};

#[derive(Parser, Debug)]
#[command(name = "shaver", version, about = "Render PDF pages to image files.")]
struct Args {
    /// PDF to render.
    input: PathBuf,

    /// Output file. The extension picks the format (png, jpg, gif, bmp, tiff,
    /// tga, webp, ppm, ico); `{page}` is replaced by the page number.
    #[arg(short, long)]
    output: String,

    /// Pages to render, one-based: `3`, `2..5` or `4..`. Defaults to all.
    #[arg(short, long, value_parser = parse_selection)]
    pages: Option<PageSelection>,

    /// Output width in pixels. Height follows the page's aspect ratio unless
    /// also given.
    #[arg(long)]
    width: Option<u32>,

    /// Output height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// JSON render configuration.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Render through the PDFium library instead of the built-in rasterizer.
    #[cfg(feature = "pdfium")]
    #[arg(long)]
    pdfium: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => ShaverConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ShaverConfig::default(),
    };

    #[cfg(feature = "pdfium")]
    if args.pdfium {
        let engine = shaver_document::PdfiumEngine::new()
            .map_err(|err| anyhow::anyhow!("binding the PDFium library: {err:?}"))?;
        return render(&Session::with_parts(engine, RasterCodec::new(), config), &args);
    }

    render(&Session::new(config), &args)
}

fn render<E: DocumentEngine>(session: &Session<E, RasterCodec>, args: &Args) -> Result<()> {
    let document = Document::open(session, &args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;

    let indices = args
        .pages
        .unwrap_or_else(PageSelection::all)
        .indices(document.len());
    if indices.is_empty() {
        bail!(
            "no pages selected ({} has {} pages)",
            args.input.display(),
            document.len()
        );
    }
    if indices.start() != indices.end() && !args.output.contains(PAGE_PLACEHOLDER) {
        bail!("rendering several pages needs `{PAGE_PLACEHOLDER}` in --output");
    }

    let options = RenderOptions {
        width: args.width,
        height: args.height,
    };
    for index in indices {
        let page = document.page(index)?;
        let path = output_path(&args.output, page.number());
        page.render(&path, &options)
            .with_context(|| format!("rendering page {} to {}", page.number(), path.display()))?;
        tracing::info!(page = page.number(), path = %path.display(), "Wrote page");
    }
    Ok(())
}
