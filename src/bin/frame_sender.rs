//! Frame sender: streams encoded image files to the angle server over one
//! persistent connection and prints each response.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

use jointstream::protocol::{self, ServerMessage};

struct Args {
    addr: String,
    fps: f64,
    repeat: bool,
    images: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut addr = "127.0.0.1:9000".to_string();
    let mut fps = 0.0;
    let mut repeat = false;
    let mut images = Vec::new();

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--addr" => addr = iter.next().context("--addr requires a value")?,
            "--fps" => {
                fps = iter
                    .next()
                    .context("--fps requires a value")?
                    .parse()
                    .context("--fps must be a number")?
            }
            "--loop" => repeat = true,
            _ => images.push(arg),
        }
    }
    if images.is_empty() {
        bail!("usage: frame_sender [--addr HOST:PORT] [--fps N] [--loop] IMAGE...");
    }
    Ok(Args {
        addr,
        fps,
        repeat,
        images,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;

    let stream = tokio::net::TcpStream::connect(&args.addr)
        .await
        .with_context(|| format!("failed to connect to {}", args.addr))?;
    stream.set_nodelay(true)?;
    println!("Connected to {}", args.addr);

    let mut framed = protocol::message_stream(stream);
    let interval = (args.fps > 0.0).then(|| Duration::from_secs_f64(1.0 / args.fps));

    loop {
        for path in &args.images {
            let start = Instant::now();
            let bytes =
                std::fs::read(path).with_context(|| format!("failed to read {path}"))?;
            protocol::send_frame(&mut framed, bytes).await?;

            match protocol::recv_message(&mut framed).await? {
                Some(ServerMessage::Frame { keypoints, angles }) => {
                    let present = keypoints.values().filter(|point| point.is_some()).count();
                    println!(
                        "{path}: {present}/{} keypoints, {} angles ({:.1}ms)",
                        keypoints.len(),
                        angles.len(),
                        start.elapsed().as_secs_f64() * 1000.0
                    );
                    for (label, degrees) in &angles {
                        println!("  {label}: {degrees:.1}");
                    }
                }
                Some(ServerMessage::Error { error }) => {
                    println!("{path}: server error: {error}");
                }
                None => {
                    println!("Server closed the connection");
                    return Ok(());
                }
            }

            if let Some(interval) = interval {
                let elapsed = start.elapsed();
                if elapsed < interval {
                    tokio::time::sleep(interval - elapsed).await;
                }
            }
        }
        if !args.repeat {
            break;
        }
    }

    Ok(())
}
