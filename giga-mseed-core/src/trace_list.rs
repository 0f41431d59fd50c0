// Copyright (C) 2022 by GiGa infosystems
//! Assembly of records into gap-aware continuous traces.
//!
//! A [`TraceList`] groups records by source identifier (and publication version
//! when splitting is on), and within each trace keeps time-ordered
//! [`TraceSegment`]s of contiguous samples. Two records land in the same segment
//! when the gap between them is within a tolerance of
//! `min(half a sample period, configured bound)`; larger gaps start a new
//! segment, and records that overlap already-held samples go through the
//! configured [`OverlapPolicy`].
//!
//! The list owns every segment and its sample buffer outright. Records are
//! ephemeral inputs; nothing in the list points back into record bytes.
use crate::enums::{DataEncoding, OverlapPolicy, SampleType};
use crate::errors::*;
use crate::settings::MseedSettings;
use crate::time::{format_nstime, NsTime};
use crate::{MseedRecord, SampleBuffer};

use log::{debug, warn};
use std::collections::HashMap;

/// A contiguous, time-ordered run of decoded samples within one trace.
#[derive(Debug, Clone)]
pub struct TraceSegment {
    /// Time of the first sample.
    pub start_time: NsTime,
    /// Time of the last sample.
    pub end_time: NsTime,
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// The payload encoding the samples arrived in. Records merge into a
    /// segment only when it matches.
    pub(crate) encoding: DataEncoding,
    pub(crate) samples: SampleBuffer,
}

impl TraceSegment {
    fn from_record(record: &MseedRecord, samples: SampleBuffer) -> Self {
        TraceSegment {
            start_time: record.start_time,
            end_time: record.end_time(),
            sample_rate: record.sample_rate_hz(),
            encoding: record.encoding,
            samples,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn sample_type(&self) -> SampleType {
        self.samples.sample_type()
    }

    /// The decoded samples of this segment.
    pub fn samples(&self) -> &SampleBuffer {
        &self.samples
    }

    /// The payload encoding the samples arrived in.
    pub fn encoding(&self) -> DataEncoding {
        self.encoding
    }

    /// The sample period in nanoseconds, or 0 for unsampled (text) data.
    pub fn period_ns(&self) -> i64 {
        if self.sample_rate > 0.0 {
            (crate::time::NSTMODULUS as f64 / self.sample_rate).round() as i64
        } else {
            0
        }
    }
}

/// All segments of one source identifier (and publication version, when the
/// list splits by version).
#[derive(Debug, Clone)]
pub struct Trace {
    pub sid: String,
    /// The version this trace is keyed on; 0 when the list does not split by
    /// version.
    pub publication_version: u8,
    pub(crate) segments: Vec<TraceSegment>,
}

impl Trace {
    /// The segments in time order.
    pub fn segments(&self) -> std::slice::Iter<TraceSegment> {
        self.segments.iter()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// The start of the earliest segment.
    pub fn earliest(&self) -> Option<NsTime> {
        self.segments.first().map(|s| s.start_time)
    }

    /// The end of the latest segment.
    pub fn latest(&self) -> Option<NsTime> {
        self.segments.last().map(|s| s.end_time)
    }

    pub fn total_sample_count(&self) -> usize {
        self.segments.iter().map(|s| s.sample_count()).sum()
    }
}

/// Where an inserted record ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record's samples were appended to an existing segment.
    Appended,
    /// The record's samples were prepended to an existing segment.
    Prepended,
    /// A new segment was created.
    NewSegment,
    /// The record overlapped held samples and was dropped.
    DroppedOverlap,
    /// The record overlapped held samples which were overwritten in place.
    Replaced,
    /// The record held no samples; nothing changed.
    Empty,
}

/// A list of traces assembled from records.
///
/// Traces stay in first-seen order; segments within a trace stay in time
/// order. A hash lookup accelerates the key search, but the iteration order is
/// the external contract.
#[derive(Debug, Default)]
pub struct TraceList {
    traces: Vec<Trace>,
    lookup: HashMap<(String, u8), usize>,
    settings: MseedSettings,
}

impl TraceList {
    pub fn new(settings: MseedSettings) -> Self {
        TraceList {
            traces: Vec::new(),
            lookup: HashMap::new(),
            settings,
        }
    }

    pub fn get_settings(&self) -> &MseedSettings {
        &self.settings
    }

    /// The traces in first-seen order.
    pub fn traces(&self) -> std::slice::Iter<Trace> {
        self.traces.iter()
    }

    pub fn trace_count(&self) -> usize {
        self.traces.len()
    }

    /// Find a trace by identifier, and by version when splitting is on.
    pub fn get_trace(&self, sid: &str, publication_version: u8) -> Option<&Trace> {
        let version = if self.settings.split_by_version {
            publication_version
        } else {
            0
        };
        self.lookup
            .get(&(sid.to_string(), version))
            .map(|&i| &self.traces[i])
    }

    /// Insert one record, decoding its payload if the caller has not already.
    pub fn insert(&mut self, record: &MseedRecord) -> Result<InsertOutcome, MseedError> {
        if record.sample_count == 0 {
            return Ok(InsertOutcome::Empty);
        }
        let samples = match &record.samples {
            Some(samples) => samples.clone(),
            None => record.decoded_samples()?,
        };
        if samples.is_empty() {
            return Ok(InsertOutcome::Empty);
        }

        let version = if self.settings.split_by_version {
            record.publication_version
        } else {
            0
        };
        let key = (record.sid.clone(), version);
        let trace_idx = match self.lookup.get(&key) {
            Some(&i) => i,
            None => {
                self.traces.push(Trace {
                    sid: record.sid.clone(),
                    publication_version: version,
                    segments: Vec::new(),
                });
                self.lookup.insert(key, self.traces.len() - 1);
                self.traces.len() - 1
            }
        };

        let period = record.sample_period_ns();
        let mut tolerance = period / 2;
        if let Some(bound) = self.settings.time_tolerance {
            tolerance = tolerance.min(bound);
        }
        let overlap_policy = self.settings.overlap_policy;
        let trace = &mut self.traces[trace_idx];
        insert_into_trace(
            trace,
            record,
            samples,
            period,
            tolerance,
            overlap_policy,
        )
    }

    /// A fixed-format listing: identifier, span, rate, sample count and
    /// publication version, one line per segment.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for trace in &self.traces {
            for segment in &trace.segments {
                out.push_str(&format!(
                    "{:<24} {}  {}  {:>11.6} Hz  {:>9} samples  (version {})\n",
                    trace.sid,
                    format_nstime(segment.start_time),
                    format_nstime(segment.end_time),
                    segment.sample_rate,
                    segment.sample_count(),
                    trace.publication_version,
                ));
            }
        }
        out
    }
}

fn rate_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= a.abs().max(b.abs()) * 1e-9
}

fn compatible(segment: &TraceSegment, record: &MseedRecord, samples: &SampleBuffer) -> bool {
    rate_close(segment.sample_rate, record.sample_rate_hz())
        && segment.sample_type() == samples.sample_type()
        && segment.encoding == record.encoding
}

fn insert_into_trace(
    trace: &mut Trace,
    record: &MseedRecord,
    samples: SampleBuffer,
    period: i64,
    tolerance: i64,
    overlap_policy: OverlapPolicy,
) -> Result<InsertOutcome, MseedError> {
    let record_start = record.start_time;
    let record_end = record.end_time();

    if trace.segments.is_empty() {
        trace
            .segments
            .push(TraceSegment::from_record(record, samples));
        return Ok(InsertOutcome::NewSegment);
    }

    // The segment closest in time decides how the record is classified.
    let closest = (0..trace.segments.len())
        .min_by_key(|&i| {
            let segment = &trace.segments[i];
            if record_start > segment.end_time {
                record_start - segment.end_time
            } else if record_end < segment.start_time {
                segment.start_time - record_end
            } else {
                0
            }
        })
        .unwrap();

    let segment = &mut trace.segments[closest];
    let gap_after = record_start - segment.end_time - period;
    let lead_before = segment.start_time - record_end - period;
    let merge_ok = compatible(segment, record, &samples);

    if merge_ok && gap_after.abs() <= tolerance {
        segment.samples.append(&samples)?;
        segment.end_time = record_end;
        coalesce_forward(trace, closest, tolerance);
        return Ok(InsertOutcome::Appended);
    }
    if merge_ok && lead_before.abs() <= tolerance {
        segment.samples.prepend(&samples)?;
        segment.start_time = record_start;
        if closest > 0 {
            coalesce_forward(trace, closest - 1, tolerance);
        }
        return Ok(InsertOutcome::Prepended);
    }

    let overlaps = record_start <= segment.end_time && record_end >= segment.start_time;
    if overlaps {
        match overlap_policy {
            OverlapPolicy::KeepExisting => {
                debug!(
                    "dropping record {} [{} - {}]: overlaps held samples",
                    record.sid,
                    format_nstime(record_start),
                    format_nstime(record_end)
                );
                return Ok(InsertOutcome::DroppedOverlap);
            }
            OverlapPolicy::Replace => {
                // In-place replacement needs the record to sit on the segment's
                // sample grid and inside its span.
                if merge_ok && period > 0 {
                    let offset_ns = record_start - segment.start_time;
                    let index = (offset_ns as f64 / period as f64).round() as i64;
                    let aligned = (offset_ns - index * period).abs() <= tolerance;
                    if aligned
                        && index >= 0
                        && index as usize + samples.len() <= segment.sample_count()
                    {
                        segment
                            .samples
                            .overwrite(index as usize, &samples, samples.len())?;
                        return Ok(InsertOutcome::Replaced);
                    }
                }
                warn!(
                    "record {} [{} - {}] overlaps but cannot replace in place; dropping",
                    record.sid,
                    format_nstime(record_start),
                    format_nstime(record_end)
                );
                return Ok(InsertOutcome::DroppedOverlap);
            }
        }
    }

    // A genuine gap on both sides: a new segment in time order.
    let position = trace
        .segments
        .partition_point(|s| s.start_time < record_start);
    trace
        .segments
        .insert(position, TraceSegment::from_record(record, samples));
    Ok(InsertOutcome::NewSegment)
}

/// Merge segment `index + 1` into segment `index` if the two are now
/// contiguous within the tolerance.
fn coalesce_forward(trace: &mut Trace, index: usize, tolerance: i64) {
    if index + 1 >= trace.segments.len() {
        return;
    }
    let (left, right) = trace.segments.split_at_mut(index + 1);
    let a = &mut left[index];
    let b = &right[0];
    let gap = b.start_time - a.end_time - a.period_ns();
    let compatible = rate_close(a.sample_rate, b.sample_rate)
        && a.sample_type() == b.sample_type()
        && a.encoding == b.encoding;
    if compatible && gap.abs() <= tolerance {
        if a.samples.append(&b.samples).is_ok() {
            a.end_time = b.end_time;
            trace.segments.remove(index + 1);
        }
    }
}
