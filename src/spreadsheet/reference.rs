//! Conversions between spreadsheet cell references ("B3", "AA") and numeric coordinates.
//!
//! Column letters use bijective base-26: there is no zero digit, so `A = 1`, `Z = 26`,
//! `AA = 27`, `AZ = 52`, `BA = 53`, `ZZ = 702`, `AAA = 703`.

/// Converts a 1-based column number to its spreadsheet letters.
/// Returns an empty string for 0, which has no letter form.
pub(crate) fn column_letters(column: usize) -> String {
    let mut column = column;
    let mut letters = Vec::<u8>::new();
    while column > 0 {
        column -= 1;
        letters.push(b'A' + (column % 26) as u8);
        column /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Highest addressable column, "ZZZ".
pub(crate) const MAX_COLUMN: usize = 18278;

/// Converts spreadsheet letters (case-insensitive) to a 1-based column number.
/// Returns None for empty input, non-letters, or columns past [`MAX_COLUMN`].
pub(crate) fn letters_to_column(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters
        .chars()
        .try_fold(0usize, |column, letter| {
            if !letter.is_ascii_alphabetic() {
                return None;
            }
            let digit = (letter.to_ascii_uppercase() as usize) - ('A' as usize) + 1;
            column.checked_mul(26)?.checked_add(digit)
        })
        .filter(|column| *column <= MAX_COLUMN)
}

/// Returns the A1-style address of a 1-based (row, column) pair, e.g. (3, 2) -> "B3".
pub(crate) fn cell_address(row: usize, column: usize) -> String {
    format!("{}{}", column_letters(column), row)
}

/// Parses column letters into a 0-based column index.
pub(crate) fn col_to_index(letters: &str) -> Option<usize> {
    letters_to_column(letters).map(|column| column - 1)
}

/// Parses a 1-based row number into a 0-based row index.
pub(crate) fn row_to_index(number: &str) -> Option<usize> {
    number
        .parse::<usize>()
        .ok()
        .filter(|row| *row > 0)
        .map(|row| row - 1)
}

/// Splits an A1 cell address ("B3") into its 1-based (row, column) pair.
pub(crate) fn parse_cell_address(address: &str) -> Option<(usize, usize)> {
    let split = address.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = address.split_at(split);
    let column = letters_to_column(letters)?;
    let row = row_to_index(digits)? + 1;
    Some((row, column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_known_values() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(52), "AZ");
        assert_eq!(column_letters(53), "BA");
        assert_eq!(column_letters(702), "ZZ");
        assert_eq!(column_letters(703), "AAA");
        assert_eq!(column_letters(18278), "ZZZ");
        assert_eq!(column_letters(0), "");
    }

    #[test]
    fn letters_round_trip_through_zzz() {
        for column in 1..=18278 {
            assert_eq!(letters_to_column(&column_letters(column)), Some(column));
        }
    }

    #[test]
    fn letters_to_column_rejects_garbage() {
        assert_eq!(letters_to_column(""), None);
        assert_eq!(letters_to_column("A1"), None);
        assert_eq!(letters_to_column("ab"), Some(28));
        assert_eq!(letters_to_column("ZZZ"), Some(MAX_COLUMN));
        assert_eq!(letters_to_column("AAAA"), None);
        assert_eq!(letters_to_column("People"), None);
    }

    #[test]
    fn cell_addresses() {
        assert_eq!(cell_address(3, 2), "B3");
        assert_eq!(parse_cell_address("AA10"), Some((10, 27)));
        assert_eq!(parse_cell_address("B0"), None);
        assert_eq!(parse_cell_address("12"), None);
        assert_eq!(parse_cell_address("C"), None);
    }
}
