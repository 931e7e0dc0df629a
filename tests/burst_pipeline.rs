//! End-to-end: encoded frames in, `D#####.mat` files out.

use adcp_waves::ensemble::{
    AncillaryData, BeamVelocity, Correlation, EarthVelocity, EnsembleData, Profile, RangeTracking,
};
use adcp_waves::matfile::{self, MatVariable};
use adcp_waves::waves::{ChannelSource, IngestSummary};
use adcp_waves::{BurstEvent, Ensemble, WaveForceCodec, WaveSettings};
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

fn frame(number: i32, beams: usize, bins: usize) -> Ensemble {
    let vertical = beams == 1;
    let profile = |scale: f32| {
        Profile::new(
            (0..bins)
                .map(|bin| (0..beams).map(|beam| scale * (bin + 1) as f32 + beam as f32).collect())
                .collect(),
        )
    };
    Ensemble {
        ensemble_data: Some(EnsembleData {
            ensemble_number: number,
            num_bins: bins as i32,
            num_beams: beams as i32,
            year: 2020,
            month: 2,
            day: 29,
            hour: 6,
            second: number,
            serial_number: "01300000000000000000000000000042".to_string(),
            subsystem_code: if vertical { b'A' } else { b'3' },
            subsystem_config: u8::from(vertical),
            ..Default::default()
        }),
        ancillary: Some(AncillaryData {
            first_bin_range: 2.0,
            bin_size: 1.0,
            transducer_depth: 20.0,
            heading: 90.0,
            ..Default::default()
        }),
        beam_velocity: Some(BeamVelocity(profile(0.1))),
        earth_velocity: (!vertical).then(|| EarthVelocity(profile(0.2))),
        correlation: Some(Correlation(Profile::new(vec![vec![1.0; beams]; bins]))),
        range_tracking: Some(RangeTracking {
            num_beams: beams as f32,
            snr: vec![30.0; beams],
            range: (0..beams).map(|b| 18.0 + b as f32).collect(),
            pings: vec![1.0; beams],
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn settings(dir: &Path, burst: usize) -> WaveSettings {
    WaveSettings {
        ensembles_in_burst: burst,
        output_dir: dir.to_path_buf(),
        latitude: 21.3,
        longitude: -157.9,
        selected_bins: vec![1, 2],
        ..WaveSettings::default()
    }
}

fn variable<'a>(vars: &'a [MatVariable], name: &str) -> Result<&'a MatVariable> {
    vars.iter().find(|v| v.name == name).with_context(|| format!("{} missing", name))
}

async fn next_written(events: &mut broadcast::Receiver<BurstEvent>) -> Result<PathBuf> {
    match events.recv().await? {
        BurstEvent::Written { path, .. } => Ok(path),
        BurstEvent::Failed { error } => bail!("burst failed: {}", error),
    }
}

#[tokio::test]
async fn four_beam_frames_become_one_record() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();
    let dir = tempfile::tempdir()?;
    let codec = WaveForceCodec::new(settings(dir.path(), 6))?;
    let mut events = codec.subscribe();

    let mut flushes = 0;
    for i in 0..6 {
        let bytes = frame(i, 4, 4).encode()?;
        if codec.add_bytes(&bytes)? {
            flushes += 1;
        }
    }
    assert_eq!(flushes, 1);
    assert_eq!(codec.pending().total_ensembles, 0);

    let path = next_written(&mut events).await?;
    assert_eq!(path, dir.path().join("D00000.mat"));
    let vars = matfile::parse_all(&std::fs::read(&path)?)?;

    let txt = variable(&vars, "txt")?.text_value().context("txt is text")?;
    assert_eq!(txt, "2020/02/29 06:00:00.00, Record No. 0, SN01300000000000000000000000000042");
    assert_eq!(variable(&vars, "lat")?.values, vec![21.3]);
    assert_eq!(variable(&vars, "whv")?.values, vec![3.0, 4.0]);
    assert!((variable(&vars, "wdt")?.values[0] - 1.0).abs() < 1e-3);

    let wus = variable(&vars, "wus")?;
    assert_eq!((wus.rows, wus.cols), (6, 2));
    assert!((wus.get(5, 1).context("cell")? - 0.6).abs() < 1e-6);
    let wr3 = variable(&vars, "wr3")?;
    assert_eq!((wr3.rows, wr3.cols), (6, 1));
    assert!(vars.iter().all(|v| !v.name.starts_with("wz")));

    assert_eq!(codec.finish().await, 0);
    Ok(())
}

#[tokio::test]
async fn interleaved_stream_through_ingest() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let codec = WaveForceCodec::new(settings(dir.path(), 3))?;
    let mut events = codec.subscribe();

    let (tx, source) = ChannelSource::channel(8);
    let producer = tokio::spawn(async move {
        // V F V F V, then a frame that is cut short
        for i in 0..5 {
            let beams = if i % 2 == 0 { 1 } else { 4 };
            let bytes = frame(i, beams, 4).encode().expect("frame encodes");
            if tx.send(bytes).await.is_err() {
                return;
            }
        }
        let truncated = frame(9, 4, 4).encode().expect("frame encodes")[..40].to_vec();
        let _ = tx.send(truncated).await;
    });

    let summary = codec.ingest(source, CancellationToken::new()).await;
    producer.await?;
    assert_eq!(summary, IngestSummary { frames: 6, skipped: 1, flushes: 1 });

    let path = next_written(&mut events).await?;
    let vars = matfile::parse_all(&std::fs::read(&path)?)?;
    assert_eq!(variable(&vars, "wps")?.rows, 1);
    assert_eq!(variable(&vars, "wzp")?.rows, 2);
    let wz0 = variable(&vars, "wz0")?;
    assert_eq!((wz0.rows, wz0.cols), (2, 2));
    assert!((variable(&vars, "wdt")?.values[0] - 2.0).abs() < 1e-3);

    let pending = codec.pending();
    assert_eq!((pending.buffered, pending.vertical_ensembles), (2, 0));
    assert_eq!(codec.finish().await, 2);
    Ok(())
}

#[tokio::test]
async fn existing_records_are_not_overwritten() -> Result<()> {
    let dir = tempfile::tempdir()?;
    for n in 0..3 {
        std::fs::write(dir.path().join(format!("D{:05}.mat", n)), b"keep")?;
    }
    let codec = WaveForceCodec::new(settings(dir.path(), 2))?;
    let mut events = codec.subscribe();
    for i in 0..4 {
        codec.add(frame(i, 4, 4));
    }

    let first = next_written(&mut events).await?;
    let second = next_written(&mut events).await?;
    assert_eq!(first, dir.path().join("D00003.mat"));
    assert_eq!(second, dir.path().join("D00004.mat"));
    assert_eq!(std::fs::read(dir.path().join("D00001.mat"))?, b"keep");

    let vars = matfile::parse_all(&std::fs::read(&second)?)?;
    let txt = variable(&vars, "txt")?.text_value().context("txt is text")?;
    assert!(txt.contains("Record No. 4"), "{}", txt);
    codec.finish().await;
    Ok(())
}
