//! Composition and splitting of FDSN source identifiers.
//!
//! The canonical form is `FDSN:NET_STA_LOC_BAND_SOURCE_SUBSOURCE`, where the last
//! three fields are the expanded channel code. A legacy 3-character channel `XYZ`
//! expands deterministically to `X_Y_Z`; the reverse collapse only applies when
//! each of the three fields is a single character.
use crate::errors::*;

/// The namespace prefix of every canonical source identifier.
pub const SID_PREFIX: &str = "FDSN:";

/// Expand a legacy channel code to the `BAND_SOURCE_SUBSOURCE` form.
///
/// A 3-character code without separators becomes `X_Y_Z`; anything already
/// containing `_` is passed through untouched.
/// ```
/// use giga_mseed_core::sid::expand_channel;
///
/// assert_eq!(&expand_channel("BHZ").unwrap(), "B_H_Z");
/// assert_eq!(&expand_channel("B_H_Z").unwrap(), "B_H_Z");
/// ```
pub fn expand_channel(channel: &str) -> Result<String, MseedError> {
    let channel = channel.trim();
    if channel.contains('_') {
        return Ok(channel.to_string());
    }
    match channel.len() {
        0 => Ok(String::new()),
        3 => {
            let mut chars = channel.chars();
            let (b, s, p) = (
                chars.next().unwrap(),
                chars.next().unwrap(),
                chars.next().unwrap(),
            );
            Ok(format!("{}_{}_{}", b, s, p))
        }
        _ => Err(MseedError::InvalidSid {
            msg: format!("channel '{}' is neither expanded nor 3 characters", channel),
        }),
    }
}

/// Collapse an expanded channel back to the 3-character form where possible.
fn collapse_channel(channel: &str) -> String {
    let fields: Vec<&str> = channel.split('_').collect();
    if fields.len() == 3 && fields.iter().all(|f| f.len() == 1) {
        fields.concat()
    } else {
        channel.to_string()
    }
}

/// Compose a canonical source identifier from network, station, location and
/// channel codes. The codes are trimmed and a legacy channel is expanded.
pub fn sid_from_nslc(
    network: &str,
    station: &str,
    location: &str,
    channel: &str,
) -> Result<String, MseedError> {
    let channel = expand_channel(channel)?;
    for (name, code) in [
        ("network", network),
        ("station", station),
        ("location", location),
    ]
    .iter()
    {
        if code.contains('_') || code.contains(':') {
            return Err(MseedError::InvalidSid {
                msg: format!("{} code '{}' contains a reserved character", name, code),
            });
        }
    }
    Ok(format!(
        "{}{}_{}_{}_{}",
        SID_PREFIX,
        network.trim(),
        station.trim(),
        location.trim(),
        channel
    ))
}

/// Split a canonical source identifier into network, station, location and
/// channel codes. The channel is collapsed to the 3-character form when each
/// of its fields is a single character.
/// ```
/// use giga_mseed_core::sid::nslc_from_sid;
///
/// let (net, sta, loc, cha) = nslc_from_sid("FDSN:IU_ANMO_00_B_H_Z").unwrap();
/// assert_eq!(&net, "IU");
/// assert_eq!(&sta, "ANMO");
/// assert_eq!(&loc, "00");
/// assert_eq!(&cha, "BHZ");
/// ```
pub fn nslc_from_sid(sid: &str) -> Result<(String, String, String, String), MseedError> {
    let rest = sid.strip_prefix(SID_PREFIX).ok_or(MseedError::InvalidSid {
        msg: format!("'{}' does not start with {}", sid, SID_PREFIX),
    })?;
    let fields: Vec<&str> = rest.split('_').collect();
    if fields.len() != 6 {
        return Err(MseedError::InvalidSid {
            msg: format!("'{}' does not have 6 underscore separated fields", sid),
        });
    }
    let channel = collapse_channel(&fields[3..].join("_"));
    Ok((
        fields[0].to_string(),
        fields[1].to_string(),
        fields[2].to_string(),
        channel,
    ))
}
