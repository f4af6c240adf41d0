use crate::{error::LoadError, BlackboardValue};
use std::{str::FromStr, time::Duration};

/// Arguments given to a node in a tree source, as `name <- value` pairs.
///
/// Values are kept as written. The accessors parse them on demand and report
/// which node and argument was at fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeArgs<'a> {
    node: &'a str,
    args: Vec<(&'a str, &'a str)>,
}

impl<'a> NodeArgs<'a> {
    pub fn new(node: &'a str, args: Vec<(&'a str, &'a str)>) -> Self {
        Self { node, args }
    }

    /// Type name of the node these arguments belong to.
    pub fn node(&self) -> &'a str {
        self.node
    }

    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.args
            .iter()
            .find(|(arg, _)| *arg == name)
            .map(|(_, value)| *value)
    }

    pub fn required(&self, name: &str) -> Result<&'a str, LoadError> {
        self.get(name).ok_or_else(|| LoadError::MissingArgument {
            node: self.node.to_owned(),
            arg: name.to_owned(),
        })
    }

    pub fn parse<T: FromStr>(&self, name: &str) -> Result<T, LoadError> {
        let value = self.required(name)?;
        value.parse().map_err(|_| self.bad(name, value))
    }

    pub fn parse_or<T: FromStr>(&self, name: &str, default: T) -> Result<T, LoadError> {
        match self.get(name) {
            Some(value) => value.parse().map_err(|_| self.bad(name, value)),
            None => Ok(default),
        }
    }

    /// A duration written in seconds, like `"0.2"`.
    pub fn seconds(&self, name: &str) -> Result<Duration, LoadError> {
        let value = self.required(name)?;
        self.to_duration(name, value)
    }

    pub fn seconds_or(&self, name: &str, default: Duration) -> Result<Duration, LoadError> {
        match self.get(name) {
            Some(value) => self.to_duration(name, value),
            None => Ok(default),
        }
    }

    /// A blackboard literal: `true`/`false`, a number, or text.
    pub fn value(&self, name: &str) -> Result<BlackboardValue, LoadError> {
        self.required(name).map(BlackboardValue::parse_literal)
    }

    /// Rejects arguments the node type does not know about, which are most
    /// likely typos.
    pub(crate) fn check_accepted(&self, accepted: &[&str]) -> Result<(), LoadError> {
        match self.args.iter().find(|(arg, _)| !accepted.contains(arg)) {
            Some((arg, _)) => Err(LoadError::UnknownArgument {
                node: self.node.to_owned(),
                arg: (*arg).to_owned(),
            }),
            None => Ok(()),
        }
    }

    fn to_duration(&self, name: &str, value: &str) -> Result<Duration, LoadError> {
        match value.parse::<f64>() {
            Ok(secs) if secs.is_finite() && secs >= 0. => Ok(Duration::from_secs_f64(secs)),
            _ => Err(self.bad(name, value)),
        }
    }

    fn bad(&self, name: &str, value: &str) -> LoadError {
        LoadError::BadArgument {
            node: self.node.to_owned(),
            arg: name.to_owned(),
            value: value.to_owned(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = NodeArgs::new("Wait", vec![("duration", "1.5"), ("label", "idle")]);
        assert_eq!(args.seconds("duration").unwrap(), Duration::from_millis(1500));
        assert_eq!(args.get("label"), Some("idle"));
        assert_eq!(args.parse_or("count", 3).unwrap(), 3);
        assert!(matches!(
            args.seconds("variance"),
            Err(LoadError::MissingArgument { .. })
        ));
        assert_eq!(args.seconds_or("variance", Duration::ZERO).unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_bad_args() {
        let args = NodeArgs::new("Wait", vec![("duration", "-1"), ("amount", "lots")]);
        assert!(matches!(
            args.seconds("duration"),
            Err(LoadError::BadArgument { ref value, .. }) if value == "-1"
        ));
        assert!(matches!(
            args.parse::<f32>("amount"),
            Err(LoadError::BadArgument { .. })
        ));
        assert!(matches!(
            args.check_accepted(&["duration"]),
            Err(LoadError::UnknownArgument { ref arg, .. }) if arg == "amount"
        ));
        assert!(args.check_accepted(&["duration", "amount"]).is_ok());
    }
}
