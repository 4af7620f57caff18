// ============================================================================
// Identifier Case Conversion
// ============================================================================
//
// Artifact names are free text ("Customer Orders"). Generated code needs
// them as identifiers, so every consumer goes through these helpers.

/// `"CustomerOrders"` → `"customer_orders"`
pub fn to_snake_case(s: &str) -> String {
    split_words(s).join("_")
}

/// `"CustomerOrders"` → `"customer-orders"`
pub fn to_kebab_case(s: &str) -> String {
    split_words(s).join("-")
}

/// `"customer orders"` → `"CustomerOrders"`, `"HTTPRequest"` → `"HttpRequest"`
pub fn to_pascal_case(s: &str) -> String {
    split_words(s)
        .into_iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => {
                    let mut out = String::new();
                    out.extend(first.to_uppercase());
                    out.push_str(chars.as_str());
                    out
                }
                None => String::new(),
            }
        })
        .collect()
}

/// Split on `_`, `-`, whitespace, lower→upper transitions and acronym ends
/// (`HTTPServer` → `http`, `server`). Words come back lowercased.
pub fn split_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '_' || c == '-' || c == '.' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(current.to_lowercase());
                current.clear();
            }
            continue;
        }

        if let Some(&next) = chars.peek() {
            if c.is_lowercase() && next.is_uppercase() {
                current.push(c);
                words.push(current.to_lowercase());
                current.clear();
                continue;
            }

            if c.is_uppercase()
                && next.is_uppercase()
                && chars.clone().nth(1).is_some_and(|n| n.is_lowercase())
            {
                current.push(c);
                words.push(current.to_lowercase());
                current.clear();
                continue;
            }
        }

        current.push(c);
    }

    if !current.is_empty() {
        words.push(current.to_lowercase());
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_between_cases() {
        assert_eq!(to_snake_case("Customer Orders"), "customer_orders");
        assert_eq!(to_kebab_case("customerOrders"), "customer-orders");
        assert_eq!(to_pascal_case("customer-orders"), "CustomerOrders");
        assert_eq!(to_pascal_case("HTTPRequest"), "HttpRequest");
    }

    #[test]
    fn empty_input_yields_no_words() {
        assert!(split_words("  -_ ").is_empty());
        assert_eq!(to_snake_case(""), "");
    }
}
