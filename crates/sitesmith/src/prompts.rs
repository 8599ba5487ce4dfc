use indoc::formatdoc;

use crate::systems::System;

/// Assemble the system prompt for a build, weaving in the system's own
/// description and instructions.
pub fn system_prompt(system: &dyn System) -> String {
    formatdoc! {"
        You are an expert web developer building a static website from a user's
        description. You operate the following system:

        {name}: {description}

        {instructions}

        Guidelines:
        - Decide on the files the site needs and create them with the tools in a
          single pass. Do not ask the user questions.
        - The site must be fully self-contained: inline or relative assets only,
          no external network resources.
        - Always create index.html at the project root so the site can be
          previewed.
        - After the tools have run you will be told their results; reply with a
          short summary of what was built.
        ",
        name = system.name(),
        description = system.description(),
        instructions = system.instructions(),
    }
}
