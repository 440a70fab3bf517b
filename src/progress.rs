/// Observer for pipeline progress.
///
/// `percent` only ever grows within one request. `status` is a short
/// human-readable line when the visible status text should change, `None`
/// when only the percentage moves.
pub trait ProgressReporter {
    fn report(&mut self, percent: u8, status: Option<&str>);
}

impl<F> ProgressReporter for F
where
    F: FnMut(u8, Option<&str>),
{
    fn report(&mut self, percent: u8, status: Option<&str>) {
        self(percent, status)
    }
}

/// Discards every checkpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _percent: u8, _status: Option<&str>) {}
}

/// Writes checkpoints to the `log` facade at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&mut self, percent: u8, status: Option<&str>) {
        match status {
            Some(status) => log::info!("[{percent:>3}%] {status}"),
            None => log::info!("[{percent:>3}%]"),
        }
    }
}

/// The fixed checkpoints of one successful request, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    ParsingText,
    ExtractingMel,
    ExtractingWaveforms,
    WaveformsReady,
    PostProcessing,
    Done,
}

impl Checkpoint {
    pub const ALL: [Checkpoint; 6] = [
        Checkpoint::ParsingText,
        Checkpoint::ExtractingMel,
        Checkpoint::ExtractingWaveforms,
        Checkpoint::WaveformsReady,
        Checkpoint::PostProcessing,
        Checkpoint::Done,
    ];

    pub fn percent(self) -> u8 {
        match self {
            Checkpoint::ParsingText => 10,
            Checkpoint::ExtractingMel => 20,
            Checkpoint::ExtractingWaveforms => 40,
            Checkpoint::WaveformsReady => 70,
            Checkpoint::PostProcessing => 80,
            Checkpoint::Done => 100,
        }
    }

    pub fn status(self) -> Option<&'static str> {
        match self {
            Checkpoint::ParsingText => Some("parsing text"),
            Checkpoint::ExtractingMel => Some("extracting mel spectrogram"),
            Checkpoint::ExtractingWaveforms => Some("extracting waveforms"),
            Checkpoint::WaveformsReady | Checkpoint::PostProcessing => None,
            Checkpoint::Done => Some("done"),
        }
    }

    pub(crate) fn emit(self, reporter: &mut dyn ProgressReporter) {
        reporter.report(self.percent(), self.status());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoints_are_strictly_increasing() {
        let percents: Vec<u8> = Checkpoint::ALL.iter().map(|c| c.percent()).collect();
        assert_eq!(percents, vec![10, 20, 40, 70, 80, 100]);
    }

    #[test]
    fn closures_are_reporters() {
        let mut seen = Vec::new();
        {
            let mut reporter = |percent: u8, status: Option<&str>| {
                seen.push((percent, status.map(str::to_string)));
            };
            Checkpoint::Done.emit(&mut reporter);
        }
        assert_eq!(seen, vec![(100, Some("done".to_string()))]);
    }
}
