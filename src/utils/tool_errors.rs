use crate::errors::ApiError;

pub fn unknown_action_error(family: &str, action: &str, known_actions: &[&str]) -> ApiError {
    let hint = if known_actions.is_empty() {
        String::new()
    } else {
        format!(" Use one of: {}.", known_actions.join(", "))
    };
    ApiError::validation(format!("Unknown {} action: {}.{}", family, action, hint))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_known_actions() {
        let err = unknown_action_error("tables", "upsert", &["query", "get"]);
        assert_eq!(
            err.message,
            "Unknown tables action: upsert. Use one of: query, get."
        );
    }
}
