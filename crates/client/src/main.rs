mod net;

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;

use net::{ClientConfig, ControlState, NetworkClient};

#[derive(Parser)]
#[command(name = "deskterm-client")]
#[command(about = "Headless prediction client")]
struct Args {
    #[arg(
        short,
        long,
        default_value = "127.0.0.1:27015",
        help = "Server address to connect to"
    )]
    server: String,

    #[arg(long, default_value_t = net::DEFAULT_FRAME_RATE)]
    fps: u32,

    #[arg(long, default_value_t = 0, help = "Frames to run; 0 runs until disconnect")]
    frames: u64,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    forward: f32,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    right: f32,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    up: f32,

    #[arg(
        long,
        default_value_t = 0.0,
        allow_hyphen_values = true,
        help = "Horizontal pointer motion per frame, in pixels"
    )]
    turn: f32,

    #[arg(long, default_value_t = net::DEFAULT_SENSITIVITY)]
    sensitivity: f32,

    #[arg(long, help = "Terminal command to send once the handshake completes")]
    cmd: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ClientConfig {
        frame_rate: args.fps.max(1),
        sensitivity: args.sensitivity,
        ..Default::default()
    };

    let mut client = NetworkClient::connect(args.server.as_str(), &config)
        .with_context(|| format!("failed to connect to {}", args.server))?;

    let controls = ControlState {
        forward: args.forward,
        right: args.right,
        up: args.up,
        pointer_delta: Vec2::new(args.turn, 0.0),
    };

    run_frames(&mut client, &config, &controls, &args);

    for line in client.terminal().iter() {
        log::info!("| {}", line);
    }
    let stats = client.stats();
    log::info!(
        "server protocol {}, {} inputs sent, {} states and {} lines received, {} dropped",
        client.handshake().server_version().unwrap_or("unknown"),
        stats.inputs_sent,
        stats.states_received,
        stats.lines_received,
        stats.lines_dropped
    );
    log::info!(
        "{} bytes sent, {} bytes received",
        stats.bytes_sent,
        stats.bytes_received
    );
    log::info!(
        "final pose {:?}, last authoritative {:?}",
        client.predicted_pose(),
        client.authoritative_pose()
    );
    client.disconnect();
    Ok(())
}

fn run_frames(
    client: &mut NetworkClient,
    config: &ClientConfig,
    controls: &ControlState,
    args: &Args,
) {
    let frame_duration = Duration::from_secs_f64(1.0 / config.frame_rate as f64);
    let mut pending_commands = args.cmd.iter();
    let mut last_frame = Instant::now();
    let mut frame: u64 = 0;

    loop {
        let frame_start = Instant::now();
        let dt = (frame_start - last_frame).as_secs_f32();
        last_frame = frame_start;

        let connected = client.update(dt, Some(controls));

        if client.is_ready() {
            if let Some(command) = pending_commands.next() {
                if let Err(e) = client.send_command(command) {
                    log::warn!("failed to send command {:?}: {}", command, e);
                }
            }
        }

        frame += 1;
        if frame % u64::from(config.frame_rate) == 0 {
            let pose = client.predicted_pose();
            log::info!(
                "frame {}: position {:?} yaw {:.3} pitch {:.3} error {:.4} target {:?}",
                frame,
                pose.position,
                pose.yaw,
                pose.pitch,
                client.prediction_error(),
                client.camera_target()
            );
        }

        if frame_loop_finished(args.frames, frame, connected) {
            break;
        }

        if let Some(remaining) = frame_duration.checked_sub(frame_start.elapsed()) {
            thread::sleep(remaining);
        }
    }
}

/// With a frame budget, prediction keeps running locally after the link
/// drops. Without one, the loop ends with the link.
fn frame_loop_finished(frame_budget: u64, frame: u64, connected: bool) -> bool {
    if frame_budget > 0 {
        frame >= frame_budget
    } else {
        !connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_budget_outlives_disconnect() {
        assert!(!frame_loop_finished(120, 10, false));
        assert!(frame_loop_finished(120, 120, false));
        assert!(frame_loop_finished(120, 120, true));
    }

    #[test]
    fn test_unbounded_loop_ends_with_link() {
        assert!(!frame_loop_finished(0, 10_000, true));
        assert!(frame_loop_finished(0, 1, false));
    }
}
