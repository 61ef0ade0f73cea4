//! Consent prompt and confirmation rendering
//!
//! The Accept button carries the prompted user and their language in its
//! custom ID, so the button callback needs no lookup to render its reply.

use poise::CreateReply;
use poise::serenity_prelude::{
    ButtonStyle, CreateActionRow, CreateButton, CreateEmbed, CreateInteractionResponseMessage,
};

/// Custom ID prefix of the Accept button
pub const ACCEPT_BUTTON_PREFIX: &str = "tos:accept";

/// Embed color used by the prompt
const PROMPT_COLOR: u32 = 0x2F3136;

/// User-facing strings for one language
#[derive(Debug)]
pub struct Texts {
    pub prompt: &'static str,
    pub accept_label: &'static str,
    pub confirmed: &'static str,
    pub record_failed: &'static str,
    pub unavailable: &'static str,
}

const EN: Texts = Texts {
    prompt: "You must accept the **Terms of Service** to use the bot.",
    accept_label: "Accept",
    confirmed: "\u{2705} You can now use the bot.",
    record_failed: "Your acceptance could not be saved. Please try again in a moment.",
    unavailable: "The bot cannot check your Terms of Service status right now. Please try again in a moment.",
};

const ES: Texts = Texts {
    prompt: "Debes aceptar los **Términos de Servicio** para usar el bot.",
    accept_label: "Aceptar",
    confirmed: "\u{2705} Ya puedes usar el bot.",
    record_failed: "No se pudo guardar tu aceptación. Inténtalo de nuevo en un momento.",
    unavailable: "El bot no puede comprobar tu estado de los Términos de Servicio ahora. Inténtalo de nuevo en un momento.",
};

const FR: Texts = Texts {
    prompt: "Vous devez accepter les **Conditions d'utilisation** pour utiliser le bot.",
    accept_label: "Accepter",
    confirmed: "\u{2705} Vous pouvez maintenant utiliser le bot.",
    record_failed: "Votre acceptation n'a pas pu être enregistrée. Réessayez dans un instant.",
    unavailable: "Le bot ne peut pas vérifier vos Conditions d'utilisation pour le moment. Réessayez dans un instant.",
};

const PT: Texts = Texts {
    prompt: "Você precisa aceitar os **Termos de Serviço** para usar o bot.",
    accept_label: "Aceitar",
    confirmed: "\u{2705} Agora você pode usar o bot.",
    record_failed: "Não foi possível salvar sua aceitação. Tente novamente em instantes.",
    unavailable: "O bot não consegue verificar seus Termos de Serviço agora. Tente novamente em instantes.",
};

const DE: Texts = Texts {
    prompt: "Du musst die **Nutzungsbedingungen** akzeptieren, um den Bot zu verwenden.",
    accept_label: "Akzeptieren",
    confirmed: "\u{2705} Du kannst den Bot jetzt verwenden.",
    record_failed: "Deine Zustimmung konnte nicht gespeichert werden. Bitte versuche es gleich noch einmal.",
    unavailable: "Der Bot kann deinen Status gerade nicht prüfen. Bitte versuche es gleich noch einmal.",
};

/// Strings for a language code, falling back to English
#[must_use]
pub fn texts(language: &str) -> &'static Texts {
    match language {
        "es" => &ES,
        "fr" => &FR,
        "pt" => &PT,
        "de" => &DE,
        _ => &EN,
    }
}

/// Acceptance prompt shown when a command is denied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentPrompt {
    pub user_id: u64,
    pub language: String,
}

impl ConsentPrompt {
    #[must_use]
    pub fn new(user_id: u64, language: impl Into<String>) -> Self {
        Self {
            user_id,
            language: language.into(),
        }
    }

    #[must_use]
    pub fn button_id(&self) -> String {
        AcceptButton {
            user_id: self.user_id,
            language: self.language.clone(),
        }
        .custom_id()
    }

    #[must_use]
    pub fn embed(&self) -> CreateEmbed {
        CreateEmbed::default()
            .description(texts(&self.language).prompt)
            .color(PROMPT_COLOR)
    }

    #[must_use]
    pub fn button(&self) -> CreateButton {
        CreateButton::new(self.button_id())
            .label(texts(&self.language).accept_label)
            .style(ButtonStyle::Success)
    }

    /// Message carrying the embed and the Accept button
    #[must_use]
    pub fn reply(&self) -> CreateReply {
        CreateReply::default()
            .embed(self.embed())
            .components(vec![CreateActionRow::Buttons(vec![self.button()])])
    }
}

/// Decoded Accept button custom ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptButton {
    /// User the prompt was shown to
    pub user_id: u64,
    pub language: String,
}

impl AcceptButton {
    #[must_use]
    pub fn custom_id(&self) -> String {
        format!("{ACCEPT_BUTTON_PREFIX}:{}:{}", self.user_id, self.language)
    }

    /// Parse a component custom ID, `None` if it is not an Accept button
    #[must_use]
    pub fn parse(custom_id: &str) -> Option<Self> {
        let rest = custom_id.strip_prefix(ACCEPT_BUTTON_PREFIX)?.strip_prefix(':')?;
        let (user_id, language) = rest.split_once(':')?;
        Some(Self {
            user_id: user_id.parse().ok()?,
            language: language.to_string(),
        })
    }
}

/// Replaces the prompt with the confirmation, dropping embed and button
#[must_use]
pub fn confirmation_message(language: &str) -> CreateInteractionResponseMessage {
    CreateInteractionResponseMessage::new()
        .content(texts(language).confirmed)
        .embeds(Vec::new())
        .components(Vec::new())
}

/// Private confirmation for someone who pressed another user's prompt
#[must_use]
pub fn private_confirmation_message(language: &str) -> CreateInteractionResponseMessage {
    CreateInteractionResponseMessage::new()
        .content(texts(language).confirmed)
        .ephemeral(true)
}

/// Private notice that the acceptance was not recorded
#[must_use]
pub fn record_failed_message(language: &str) -> CreateInteractionResponseMessage {
    CreateInteractionResponseMessage::new()
        .content(texts(language).record_failed)
        .ephemeral(true)
}

/// Private notice that consent could not be checked
#[must_use]
pub fn unavailable_reply(language: &str) -> CreateReply {
    CreateReply::default()
        .content(texts(language).unavailable)
        .ephemeral(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texts_fallback() {
        assert_eq!(texts("fr").accept_label, "Accepter");
        assert_eq!(texts("es").accept_label, "Aceptar");
        assert_eq!(texts("ja").accept_label, "Accept");
        assert_eq!(texts("").prompt, EN.prompt);
    }

    #[test]
    fn test_button_id_round_trip() {
        let prompt = ConsentPrompt::new(42, "fr");
        assert_eq!(prompt.button_id(), "tos:accept:42:fr");

        let parsed = AcceptButton::parse(&prompt.button_id()).unwrap();
        assert_eq!(parsed.user_id, 42);
        assert_eq!(parsed.language, "fr");
    }

    #[test]
    fn test_parse_rejects_foreign_ids() {
        assert!(AcceptButton::parse("tos:accept").is_none());
        assert!(AcceptButton::parse("tos:accept:").is_none());
        assert!(AcceptButton::parse("tos:accept:abc:en").is_none());
        assert!(AcceptButton::parse("tos:acceptance:1:en").is_none());
        assert!(AcceptButton::parse("music:skip").is_none());
    }
}
