//! Identifier case conversion between caller (snake_case) and store (camelCase) conventions.
//!
//! ```text
//! created_at  ──to_store_case──▶  createdAt
//! createdAt   ──to_caller_case─▶  created_at
//! ```
//!
//! Only an underscore followed by a lowercase ASCII letter is folded, and never
//! the leading one, so `_id`, `user_1` and `a__b` survive a round trip.
//! Mixed-case caller input is outside the contract: `userID` becomes `user_i_d`
//! on the way back, and a capital first letter is simply lower-cased.

/// Convert a caller-side `snake_case` identifier to the store's `camelCase`.
pub fn to_store_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    let mut chars = ident.chars().enumerate().peekable();

    while let Some((i, c)) = chars.next() {
        if c == '_' && i > 0 {
            if let Some(&(_, next)) = chars.peek() {
                if next.is_ascii_lowercase() {
                    chars.next();
                    out.push(next.to_ascii_uppercase());
                    continue;
                }
            }
        }
        out.push(c);
    }

    out
}

/// Convert a store-side `camelCase` identifier back to the caller's `snake_case`.
pub fn to_caller_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);

    for (i, c) in ident.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_store_case() {
        assert_eq!(to_store_case("created_at"), "createdAt");
        assert_eq!(to_store_case("telegram_chat_id"), "telegramChatId");
        assert_eq!(to_store_case("email"), "email");
        assert_eq!(to_store_case("_id"), "_id");
        assert_eq!(to_store_case("user_1"), "user_1");
        assert_eq!(to_store_case("a__b"), "a_B");
        assert_eq!(to_store_case("trailing_"), "trailing_");
    }

    #[test]
    fn test_to_caller_case() {
        assert_eq!(to_caller_case("createdAt"), "created_at");
        assert_eq!(to_caller_case("telegramChatId"), "telegram_chat_id");
        assert_eq!(to_caller_case("_id"), "_id");
        assert_eq!(to_caller_case("Name"), "name");
    }

    #[test]
    fn test_round_trip() {
        let idents = [
            "id",
            "_id",
            "__v",
            "created_at",
            "a__b",
            "a_b_c",
            "user_1",
            "x_1_y",
            "trailing_",
            "_",
            "__",
            "9lives",
            "col_9_z",
        ];
        for id in idents {
            assert_eq!(to_caller_case(&to_store_case(id)), id, "round trip of {id}");
        }
    }

    #[test]
    fn test_round_trip_exhaustive_short() {
        let alphabet = ['a', 'z', '0', '_'];
        let mut words = vec![String::new()];
        for _ in 0..4 {
            let mut next = Vec::new();
            for w in &words {
                for c in alphabet {
                    next.push(format!("{w}{c}"));
                }
            }
            for w in &next {
                assert_eq!(&to_caller_case(&to_store_case(w)), w);
            }
            words = next;
        }
    }
}
