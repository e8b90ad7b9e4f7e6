use std::io::Write;

use crate::pipeline::tracked_frame::{FrameReport, TrackedFrame};

use super::presenter::Presenter;

/// Writes face and eye-center coordinates of each frame, one line per frame.
///
/// Lines are either JSON ([`FrameReport`]) or a compact human-readable form.
pub struct LogPresenter<W: Write> {
    out: W,
    json: bool,
}

impl<W: Write> LogPresenter<W> {
    pub fn new(out: W, json: bool) -> Self {
        Self { out, json }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl LogPresenter<std::io::Stdout> {
    pub fn stdout(json: bool) -> Self {
        Self::new(std::io::stdout(), json)
    }
}

fn describe(report: &FrameReport) -> String {
    if report.faces.is_empty() {
        return format!("frame {}: no face", report.index);
    }
    let faces: Vec<String> = report
        .faces
        .iter()
        .map(|face| {
            let eyes: Vec<String> = face
                .eyes
                .iter()
                .map(|eye| match &eye.center {
                    Some(c) => format!("{:?} ({}, {})", eye.side, c.x, c.y),
                    None => format!("{:?} -", eye.side),
                })
                .collect();
            format!(
                "face ({}, {} {}x{}) {}",
                face.face.x,
                face.face.y,
                face.face.width,
                face.face.height,
                eyes.join(" ")
            )
        })
        .collect();
    format!("frame {}: {}", report.index, faces.join("; "))
}

impl<W: Write> Presenter for LogPresenter<W> {
    fn present(&mut self, frame: &TrackedFrame) -> Result<(), Box<dyn std::error::Error>> {
        let report = frame.report();
        if self.json {
            serde_json::to_writer(&mut self.out, &report)?;
            writeln!(self.out)?;
        } else {
            writeln!(self.out, "{}", describe(&report))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.out.flush()?;
        Ok(())
    }
}
