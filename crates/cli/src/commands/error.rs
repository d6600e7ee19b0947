use crate::util::bold;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArgsError {
    #[error("{} must be greater than zero", bold("--amount"))]
    AmountZero,

    #[error("{flag} must be given exactly twice, got {0}", flag = bold("--seed"))]
    SeedCount(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_flag() {
        let seeds = ArgsError::SeedCount(3).to_string();
        assert!(seeds.contains("--seed"));
        assert!(seeds.ends_with("must be given exactly twice, got 3"));
        assert!(ArgsError::AmountZero
            .to_string()
            .ends_with("must be greater than zero"));
    }
}
