use jiff::SpanRelativeTo;

pub fn parse_duration(input: &str) -> Result<jiff::SignedDuration, String> {
    if let Ok(duration) = input.parse::<jiff::SignedDuration>() {
        return Ok(duration);
    }

    if let Ok(duration) = input
        .parse::<jiff::Span>()
        .and_then(|span| span.to_duration(SpanRelativeTo::days_are_24_hours()))
    {
        return Ok(duration);
    }

    if let Ok(seconds) = input.parse::<i64>() {
        return Ok(jiff::SignedDuration::from_secs(seconds.abs()));
    }

    Err(String::from("Invalid duration"))
}

pub fn parse_gap(input: &str) -> Result<f64, String> {
    let gap: f64 = input
        .parse()
        .map_err(|_| format!("Invalid optimality gap: {input}"))?;

    if !(0.0..1.0).contains(&gap) {
        return Err(format!("Optimality gap must be in [0, 1), got {gap}"));
    }

    Ok(gap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(
            parse_duration("30s").unwrap(),
            jiff::SignedDuration::from_secs(30)
        );
        assert_eq!(
            parse_duration("PT5M").unwrap(),
            jiff::SignedDuration::from_mins(5)
        );
        assert_eq!(
            parse_duration("90").unwrap(),
            jiff::SignedDuration::from_secs(90)
        );
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_parse_gap() {
        assert_eq!(parse_gap("0.001").unwrap(), 0.001);
        assert!(parse_gap("1.5").is_err());
        assert!(parse_gap("-0.1").is_err());
    }
}
