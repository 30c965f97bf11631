/// Offset between full-width ASCII forms (U+FF01..) and their half-width originals.
const FULLWIDTH_OFFSET: u32 = 0xFEE0;

/// Fold full-width Latin letters and digits to half-width, then lower-case ASCII.
///
/// Runs before every tokenizer call so that indexed and query terms compare equal.
pub fn normalize(text: &str) -> String {
    text.chars().map(|c| fold_width(c).to_ascii_lowercase()).collect()
}

fn fold_width(c: char) -> char {
    match c {
        'Ａ'..='Ｚ' | 'ａ'..='ｚ' | '０'..='９' => {
            char::from_u32(c as u32 - FULLWIDTH_OFFSET).unwrap_or(c)
        }
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_fullwidth_alphanumerics() {
        assert_eq!(normalize("ＡdA作成する"), "ada作成する");
        assert_eq!(normalize("ｗｉｎ１０"), "win10");
    }

    #[test]
    fn leaves_other_scripts_alone() {
        assert_eq!(normalize("インデックス一括，！"), "インデックス一括，！");
        assert_eq!(normalize("ÉCOLE"), "École");
    }

    #[test]
    fn is_idempotent() {
        let once = normalize("ＨＥＬＬＯ World ４２");
        assert_eq!(normalize(&once), once);
    }
}
