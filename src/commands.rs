use crate::maths::{Color, Vec3};
use crate::scene::Settings;

/// The runtime command prompt. Typed characters queue into the current
/// command until it is executed against the active scene's settings or
/// dismissed.
#[derive(Debug, Default)]
pub struct CommandLine {
    current_command: String,
    is_queueing_command: bool,
}

impl CommandLine {
    pub fn is_open(&self) -> bool {
        self.is_queueing_command
    }

    pub fn open(&mut self) {
        self.is_queueing_command = true;
    }

    pub fn close(&mut self) {
        self.current_command.clear();
        self.is_queueing_command = false;
    }

    pub fn current_command(&self) -> &str {
        &self.current_command
    }

    pub fn backspace(&mut self) {
        self.current_command.pop();
    }

    pub fn queue_character(&mut self, character: char) {
        let is_accepted = character.is_ascii_alphanumeric()
            || matches!(character, ' ' | '.' | '-' | ',');

        if is_accepted {
            self.current_command.push(character);
        }
    }

    /// Applies the queued command to the settings and closes the
    /// prompt. Unknown terms and malformed values change nothing.
    pub fn execute_current_command(&mut self, settings: &mut Settings) {
        execute(&self.current_command, settings);
        self.close();
    }
}

/// Executes one settings command of the form `term value`, e.g.
/// `ambientLightColor 255,0,200` or `brightness 0.4`.
pub fn execute(command: &str, settings: &mut Settings) {
    let Some((term, value)) = command.split_once(' ') else {
        return;
    };

    match term {
        "ambientLightColor" => {
            if let Some(color) = parse_color(value) {
                settings.ambient_light_color = color;
            }
        }
        "ambientLightVector" => {
            if let Some(vector) = parse_vec3(value) {
                settings.ambient_light_vector = vector;
            }
        }
        "ambientLightFactor" => {
            if let Ok(factor) = value.trim().parse() {
                settings.ambient_light_factor = factor;
            }
        }
        "backgroundColor" => {
            if let Some(color) = parse_color(value) {
                settings.background_color = color;
            }
        }
        "brightness" => {
            if let Ok(brightness) = value.trim().parse() {
                settings.brightness = brightness;
            }
        }
        "visibility" => {
            if let Ok(visibility) = value.trim().parse() {
                settings.visibility = visibility;
            }
        }
        _ => {}
    }
}

fn parse_triple(value: &str) -> Option<[&str; 3]> {
    let mut parts = value.split(',');
    let triple = [parts.next()?, parts.next()?, parts.next()?];

    Some(triple)
}

fn parse_color(value: &str) -> Option<Color> {
    let [r, g, b] = parse_triple(value)?;

    Some(Color::new(
        r.trim().parse::<i32>().ok()?.clamp(0, 255) as u8,
        g.trim().parse::<i32>().ok()?.clamp(0, 255) as u8,
        b.trim().parse::<i32>().ok()?.clamp(0, 255) as u8,
    ))
}

fn parse_vec3(value: &str) -> Option<Vec3> {
    let [x, y, z] = parse_triple(value)?;

    Some(Vec3::new(
        x.trim().parse().ok()?,
        y.trim().parse().ok()?,
        z.trim().parse().ok()?,
    ))
}
