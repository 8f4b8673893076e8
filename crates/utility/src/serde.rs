pub mod date_time {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone as _};
    use serde::{
        de::{Error, IntoDeserializer},
        Deserialize as _, Deserializer,
    };

    /// Deserializes a zone-less ISO timestamp (`2025-08-01T12:34:56`) as local
    /// time. Upstream transit feeds report expected times in the operator's
    /// local zone without an offset suffix.
    pub fn deserialize_local<'de, D>(
        deserializer: D,
    ) -> Result<DateTime<Local>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let naive_datetime = NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S")
            .map_err(Error::custom)?;
        let local_datetime = Local
            .from_local_datetime(&naive_datetime)
            .single()
            .ok_or_else(|| Error::custom("Invalid local datetime"))?;
        Ok(local_datetime)
    }

    pub fn deserialize_local_option<'de, D>(
        deserializer: D,
    ) -> Result<Option<DateTime<Local>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        match s {
            Some(s) => {
                let datetime = deserialize_local(s.as_str().into_deserializer())?;
                Ok(Some(datetime))
            }
            None => Ok(None),
        }
    }
}
