pub mod level {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(level.as_str())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<Level>().map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S>(level: &Option<Level>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match level {
                Some(l) => serializer.serialize_str(l.as_str()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Level>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|s| s.parse::<Level>().map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

/// Durations written in humantime form, e.g. `"1m"` or `"500ms"`.
pub mod duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::{Deserialize, Serialize};
    use tracing::Level;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Sample {
        #[serde(with = "super::duration")]
        delay: Duration,
        #[serde(with = "super::level")]
        level: Level,
    }

    #[test]
    fn parses_humantime_durations() {
        let sample: Sample = serde_yaml::from_str("delay: 1m 30s\nlevel: warn").unwrap();
        assert_eq!(sample.delay, Duration::from_secs(90));
        assert_eq!(sample.level, Level::WARN);
    }

    #[test]
    fn writes_humantime_durations() {
        let sample = Sample {
            delay: Duration::from_secs(60),
            level: Level::INFO,
        };
        let yaml = serde_yaml::to_string(&sample).unwrap();
        assert!(yaml.contains("delay: 1m"), "unexpected yaml: {yaml}");
        assert!(yaml.contains("level: INFO"), "unexpected yaml: {yaml}");
    }

    #[test]
    fn rejects_invalid_duration() {
        assert!(serde_yaml::from_str::<Sample>("delay: soon\nlevel: info").is_err());
    }
}
