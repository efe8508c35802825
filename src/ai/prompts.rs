use std::sync::OnceLock;

use minijinja::Environment;

use crate::error::PharmaError;

static ENV: OnceLock<Environment<'static>> = OnceLock::new();

pub const SUMMARIZE: &str = "summarize.txt.j2";
pub const TRANSLATE: &str = "translate.txt.j2";
pub const CHAT: &str = "chat.txt.j2";
pub const INTERACTIONS: &str = "interactions.txt.j2";

fn env() -> Result<&'static Environment<'static>, PharmaError> {
    if let Some(env) = ENV.get() {
        return Ok(env);
    }

    let mut env = Environment::new();
    env.add_template(
        "_sorani.txt.j2",
        include_str!("../../templates/prompts/_sorani.txt.j2"),
    )?;
    env.add_template(
        SUMMARIZE,
        include_str!("../../templates/prompts/summarize.txt.j2"),
    )?;
    env.add_template(
        TRANSLATE,
        include_str!("../../templates/prompts/translate.txt.j2"),
    )?;
    env.add_template(CHAT, include_str!("../../templates/prompts/chat.txt.j2"))?;
    env.add_template(
        INTERACTIONS,
        include_str!("../../templates/prompts/interactions.txt.j2"),
    )?;

    let _ = ENV.set(env);
    ENV.get()
        .ok_or_else(|| PharmaError::Internal("prompt environment not initialized".into()))
}

pub fn render(name: &str, ctx: minijinja::Value) -> Result<String, PharmaError> {
    Ok(env()?.get_template(name)?.render(ctx)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    fn assert_sorani_rules(prompt: &str) {
        assert!(prompt.contains("Arabic script only"), "{prompt}");
        assert!(prompt.contains("Kurmanji"));
        assert!(prompt.contains("دەرمان"));
    }

    #[test]
    fn summarize_prompt_carries_task_and_kurdish_rules() {
        let prompt = render(
            SUMMARIZE,
            context! { task => "side effects", rules => "Ignore dosing text.", bullets => 3 },
        )
        .unwrap();
        assert!(prompt.contains("side effects"));
        assert!(prompt.contains("exactly 3 short strings"));
        assert_sorani_rules(&prompt);
    }

    #[test]
    fn translate_prompt_carries_kurdish_rules_for_every_target() {
        let ku = render(TRANSLATE, context! { language => "Sorani Kurdish" }).unwrap();
        assert!(ku.contains("into Sorani Kurdish"));
        assert_sorani_rules(&ku);
        let ar = render(TRANSLATE, context! { language => "Arabic" }).unwrap();
        assert!(ar.contains("into Arabic"));
        assert_sorani_rules(&ar);
    }

    #[test]
    fn chat_and_interaction_prompts_render() {
        let chat = render(
            CHAT,
            context! { drug_name => "Advil", context => "{\"warnings\":\"x\"}", language => "English" },
        )
        .unwrap();
        assert!(chat.contains("\"Advil\""));
        assert!(chat.contains("{\"warnings\":\"x\"}"));
        assert_sorani_rules(&chat);

        let inter = render(
            INTERACTIONS,
            context! { drugs => "aspirin, warfarin", language => "English" },
        )
        .unwrap();
        assert!(inter.contains("aspirin, warfarin"));
        assert!(inter.contains("\"overallRisk\""));
        assert_sorani_rules(&inter);
    }
}
