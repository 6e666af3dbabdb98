use std::fmt;
use std::ops::BitOr;

use crate::error::GeneratorError;

/// A named category of characters that can contribute to an [`Alphabet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterClass {
    UpperCaseLetter,
    LowerCaseLetter,
    Number,
}

impl CharacterClass {
    /// Declaration order, which is also the order symbols appear in an alphabet.
    pub const ORDERED: [CharacterClass; 3] = [
        CharacterClass::UpperCaseLetter,
        CharacterClass::LowerCaseLetter,
        CharacterClass::Number,
    ];

    pub fn characters(self) -> &'static str {
        match self {
            CharacterClass::UpperCaseLetter => "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            CharacterClass::LowerCaseLetter => "abcdefghijklmnopqrstuvwxyz",
            CharacterClass::Number => "0123456789",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            CharacterClass::UpperCaseLetter => 0b001,
            CharacterClass::LowerCaseLetter => 0b010,
            CharacterClass::Number => 0b100,
        }
    }
}

/// A combinable set of [`CharacterClass`] flags.
///
/// ```
/// # use uniquegen::generator::{CharacterClass, CharacterClasses};
/// let classes = CharacterClasses::UPPERCASE | CharacterClasses::NUMBERS;
/// assert!(classes.contains(CharacterClass::Number));
/// assert!(!classes.contains(CharacterClass::LowerCaseLetter));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacterClasses(u8);

impl CharacterClasses {
    pub const NONE: Self = Self(0);
    pub const UPPERCASE: Self = Self(CharacterClass::UpperCaseLetter.bit());
    pub const LOWERCASE: Self = Self(CharacterClass::LowerCaseLetter.bit());
    pub const NUMBERS: Self = Self(CharacterClass::Number.bit());
    pub const ALL: Self = Self(0b111);

    pub fn contains(self, class: CharacterClass) -> bool {
        self.0 & class.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Selected classes in declaration order.
    pub fn iter(self) -> impl Iterator<Item = CharacterClass> {
        CharacterClass::ORDERED
            .into_iter()
            .filter(move |class| self.contains(*class))
    }
}

impl Default for CharacterClasses {
    fn default() -> Self {
        Self::ALL
    }
}

impl From<CharacterClass> for CharacterClasses {
    fn from(class: CharacterClass) -> Self {
        Self(class.bit())
    }
}

impl BitOr for CharacterClasses {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOr<CharacterClass> for CharacterClasses {
    type Output = Self;

    fn bitor(self, rhs: CharacterClass) -> Self {
        Self(self.0 | rhs.bit())
    }
}

impl FromIterator<CharacterClass> for CharacterClasses {
    fn from_iter<I: IntoIterator<Item = CharacterClass>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, |set, class| set | class)
    }
}

/// The deduplicated, ordered set of characters eligible for random selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    symbols: Vec<char>,
}

impl Alphabet {
    /// Builds the alphabet for a set of character classes.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::InvalidAlphabet`] when fewer than two distinct
    /// characters are selected (including the empty set).
    pub fn from_classes(classes: CharacterClasses) -> Result<Self, GeneratorError> {
        Self::from_chars(classes.iter().flat_map(|class| class.characters().chars()))
    }

    /// Builds an alphabet from arbitrary characters, keeping the first
    /// occurrence of each.
    pub fn from_chars<I: IntoIterator<Item = char>>(chars: I) -> Result<Self, GeneratorError> {
        let mut symbols: Vec<char> = Vec::new();
        for c in chars {
            if !symbols.contains(&c) {
                symbols.push(c);
            }
        }

        if symbols.len() < 2 {
            return Err(GeneratorError::InvalidAlphabet {
                size: symbols.len(),
            });
        }

        Ok(Alphabet { symbols })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    // Construction guarantees at least two symbols.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, c: char) -> bool {
        self.symbols.contains(&c)
    }

    pub(crate) fn symbols(&self) -> &[char] {
        &self.symbols
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.symbols.iter().try_for_each(|c| write!(f, "{c}"))
    }
}
