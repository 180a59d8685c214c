//! User-facing notification texts.
//!
//! Italian is the default; English is available for mixed staff.

use std::fmt;
use std::str::FromStr;

/// Notification language.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Locale {
    /// Italiano
    #[default]
    It,
    /// English
    En,
}

impl Locale {
    /// Language tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::It => "it",
            Self::En => "en",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "it" | "it-it" | "italiano" => Ok(Self::It),
            "en" | "en-gb" | "en-us" | "english" => Ok(Self::En),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

/// Message catalog for one locale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Messages {
    locale: Locale,
}

impl Messages {
    /// Catalog for `locale`.
    #[must_use]
    pub const fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Locale of this catalog.
    #[must_use]
    pub const fn locale(&self) -> Locale {
        self.locale
    }

    const fn pick(&self, it: &'static str, en: &'static str) -> &'static str {
        match self.locale {
            Locale::It => it,
            Locale::En => en,
        }
    }

    fn failure(&self, it: &'static str, en: &'static str, err: &dyn fmt::Display) -> String {
        format!("{}: {err}", self.pick(it, en))
    }

    // Movements

    /// Movement stored.
    #[must_use]
    pub fn movement_recorded(&self) -> String {
        self.pick(
            "Movimento registrato con successo",
            "Movement recorded successfully",
        )
        .to_string()
    }

    /// Movement rejected or failed.
    #[must_use]
    pub fn movement_failed(&self, err: &dyn fmt::Display) -> String {
        self.failure(
            "Errore durante la registrazione del movimento",
            "Error while recording the movement",
            err,
        )
    }

    // Assignments

    /// Loan opened.
    #[must_use]
    pub fn item_assigned(&self) -> String {
        self.pick(
            "Articolo assegnato con successo",
            "Item assigned successfully",
        )
        .to_string()
    }

    /// Loan could not be opened.
    #[must_use]
    pub fn assign_failed(&self, err: &dyn fmt::Display) -> String {
        self.failure(
            "Errore durante l'assegnazione dell'articolo",
            "Error while assigning the item",
            err,
        )
    }

    /// Loan closed.
    #[must_use]
    pub fn item_returned(&self) -> String {
        self.pick(
            "Restituzione registrata con successo",
            "Return recorded successfully",
        )
        .to_string()
    }

    /// Loan could not be closed.
    #[must_use]
    pub fn return_failed(&self, err: &dyn fmt::Display) -> String {
        self.failure(
            "Errore durante la registrazione della restituzione",
            "Error while recording the return",
            err,
        )
    }

    // Catalog

    /// Base item created or updated.
    #[must_use]
    pub fn item_saved(&self) -> String {
        self.pick("Articolo salvato con successo", "Item saved successfully")
            .to_string()
    }

    /// Base item deleted.
    #[must_use]
    pub fn item_deleted(&self) -> String {
        self.pick("Articolo eliminato con successo", "Item deleted successfully")
            .to_string()
    }

    /// Variant created or updated.
    #[must_use]
    pub fn variant_saved(&self) -> String {
        self.pick("Variante salvata con successo", "Variant saved successfully")
            .to_string()
    }

    /// Variant deleted.
    #[must_use]
    pub fn variant_deleted(&self) -> String {
        self.pick(
            "Variante eliminata con successo",
            "Variant deleted successfully",
        )
        .to_string()
    }

    /// Any catalog write failed.
    #[must_use]
    pub fn catalog_failed(&self, err: &dyn fmt::Display) -> String {
        self.failure(
            "Errore durante il salvataggio del magazzino",
            "Error while saving the warehouse catalog",
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn italian_is_the_default() {
        let messages = Messages::default();
        assert_eq!(messages.locale(), Locale::It);
        assert_eq!(messages.movement_recorded(), "Movimento registrato con successo");
    }

    #[test]
    fn failures_carry_the_error_text() {
        let it = Messages::new(Locale::It);
        assert_eq!(
            it.movement_failed(&"quantity must be a positive integer, got 0"),
            "Errore durante la registrazione del movimento: quantity must be a positive integer, got 0"
        );
        let en = Messages::new(Locale::En);
        assert_eq!(
            en.return_failed(&"boom"),
            "Error while recording the return: boom"
        );
    }

    #[test]
    fn locale_parses_tags() {
        assert_eq!("IT".parse::<Locale>().unwrap(), Locale::It);
        assert_eq!(" en-gb ".parse::<Locale>().unwrap(), Locale::En);
        assert!("fr".parse::<Locale>().is_err());
    }
}
