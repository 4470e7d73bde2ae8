use crate::args::ThemeArgs;
use crate::commands::{close, open, Out};
use crate::model::{Theme, YearMonth};
use crate::store::Mode;
use crate::{Config, Result};

/// Prints the theme, or changes it when a choice is given.
pub async fn theme(config: Config, mode: Mode, args: &ThemeArgs) -> Result<Out<Theme>> {
    let mut session = open(&config, mode, YearMonth::today()).await?;
    let message = match args.choice() {
        None => format!("The theme is {}", session.theme()),
        Some(choice) => {
            let theme = choice.apply(session.theme());
            session.set_theme(theme);
            format!("The theme is now {theme}")
        }
    };
    let theme = session.theme();
    close(session).await?;
    Ok(Out::new(message, theme))
}
