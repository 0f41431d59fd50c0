//! Reading of data selection files.
//!
//! Two line shapes are recognized, both whitespace separated with `#` starting
//! a comment and blank lines ignored:
//!
//! - identifier first: `SIDpattern [starttime [endtime [pubversion]]]`
//! - codes first: `Network Station Location Channel [starttime [endtime [pubversion]]]`
//!
//! In the codes-first shape `--` means an empty location code and a legacy
//! 3-character channel is expanded, so `IU ANMO -- BH?` selects
//! `FDSN:IU_ANMO__B_H_?`. A `*` stands for an unset time or version.
use giga_mseed_core::errors::*;
use giga_mseed_core::sid::{expand_channel, SID_PREFIX};
use giga_mseed_core::time::{parse_nstime, NsTime, NST_UNSET};
use giga_mseed_core::{SelectTime, Selection, Selections};

use std::io::{BufRead, BufReader};

/// Read a selection file. Unparseable lines fail the whole read, naming the
/// line number.
pub fn read_selection_file(file_name: &str) -> Result<Selections, MseedError> {
    let file = std::fs::File::open(file_name)?;
    let mut selections = Selections::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        match parse_selection_line(&line) {
            Ok(Some(selection)) => selections.push(selection),
            Ok(None) => {}
            Err(e) => {
                return Err(MseedError::SelectionError {
                    msg: format!("line {}: {}", number + 1, e),
                });
            }
        }
    }
    Ok(selections)
}

fn parse_time_token(token: &str) -> Result<NsTime, MseedError> {
    if token == "*" {
        Ok(NST_UNSET)
    } else {
        parse_nstime(token)
    }
}

fn parse_version_token(token: &str) -> Result<u8, MseedError> {
    if token == "*" {
        return Ok(0);
    }
    token.parse().map_err(|_| MseedError::SelectionError {
        msg: format!("bad publication version '{}'", token),
    })
}

/// Parse one line into a selection; comments and blank lines give `None`.
pub(crate) fn parse_selection_line(line: &str) -> Result<Option<Selection>, MseedError> {
    let line = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(None);
    }

    // The identifier-first shape is recognized by its namespace colon.
    let (pattern, time_tokens) = if tokens[0].contains(':') {
        (tokens[0].to_string(), &tokens[1..])
    } else {
        if tokens.len() < 4 {
            return Err(MseedError::SelectionError {
                msg: format!("expected 'Net Sta Loc Chan', got {} fields", tokens.len()),
            });
        }
        let location = if tokens[2] == "--" { "" } else { tokens[2] };
        let channel = if tokens[3] == "*" {
            "*".to_string()
        } else {
            expand_channel(tokens[3])?
        };
        let pattern = format!(
            "{}{}_{}_{}_{}",
            SID_PREFIX, tokens[0], tokens[1], location, channel
        );
        (pattern, &tokens[4..])
    };

    if time_tokens.len() > 3 {
        return Err(MseedError::SelectionError {
            msg: "too many fields".to_string(),
        });
    }
    let start = match time_tokens.first() {
        Some(token) => parse_time_token(token)?,
        None => NST_UNSET,
    };
    let end = match time_tokens.get(1) {
        Some(token) => parse_time_token(token)?,
        None => NST_UNSET,
    };
    let pub_version = match time_tokens.get(2) {
        Some(token) => parse_version_token(token)?,
        None => 0,
    };

    let time_windows = if start == NST_UNSET && end == NST_UNSET {
        Vec::new()
    } else {
        vec![SelectTime::new(start, end)]
    };
    Ok(Some(Selection::new(&pattern, time_windows, pub_version)))
}
