//! URL slug generation for categories and roles.

/// Folds common Latin accented characters to ASCII.
fn fold_accent(c: char) -> Option<char> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        _ => return None,
    };
    Some(folded)
}

/// Lowercases, folds accents and joins alphanumeric runs with `-`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars().flat_map(char::to_lowercase) {
        let c = fold_accent(c).unwrap_or(c);
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Home Repair"), "home-repair");
        assert_eq!(slugify("  spaced   out  "), "spaced-out");
    }

    #[test]
    fn test_slugify_accents() {
        assert_eq!(slugify("Électricité"), "electricite");
        assert_eq!(slugify("Modérateur Général"), "moderateur-general");
    }

    #[test]
    fn test_slugify_punctuation() {
        assert_eq!(slugify("IT & Networks!"), "it-networks");
        assert_eq!(slugify("---"), "");
    }
}
