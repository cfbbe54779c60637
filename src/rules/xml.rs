// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Pull-parsing of the routing-rules XML document.

use quick_xml::events::{BytesStart, Event};

/// Errors of reading a rules document.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid rules document: {0}")]
    Format(String),
}

/// The attribute sections a profile may define.
const SECTIONS: &[&str] = &[
    "access",
    "oneway",
    "speed",
    "priority",
    "obstacle",
    "obstacle_time",
];

#[derive(Debug, Default, PartialEq)]
pub(crate) struct ProfileSpec {
    pub(crate) name: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) parameters: Vec<(String, f32)>,
    pub(crate) sections: Vec<(String, Vec<RuleSpec>)>,
}

#[derive(Debug, Default, PartialEq)]
pub(crate) struct RuleSpec {
    pub(crate) value: String,
    pub(crate) conditions: Vec<ConditionSpec>,
}

#[derive(Debug, PartialEq)]
pub(crate) enum ConditionSpec {
    When { tag: String, value: Option<String> },
    Unless { tag: String, value: Option<String> },
    Le { a: String, b: String },
    Ge { a: String, b: String },
}

fn attr(start: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    start
        .attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == name)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

fn required_attr(start: &BytesStart<'_>, name: &str) -> Result<String, RuleError> {
    attr(start, name.as_bytes()).ok_or_else(|| {
        RuleError::Format(format!(
            "<{}> without the {:?} attribute",
            String::from_utf8_lossy(start.local_name().as_ref()),
            name
        ))
    })
}

/// Parses a whole rules document into per-profile specifications.
pub(crate) fn parse_document(text: &str) -> Result<Vec<ProfileSpec>, RuleError> {
    let mut reader = quick_xml::Reader::from_reader(text.as_bytes());

    let mut profiles: Vec<ProfileSpec> = Vec::new();
    let mut profile: Option<ProfileSpec> = None;
    let mut section: Option<(String, Vec<RuleSpec>)> = None;
    let mut rule: Option<RuleSpec> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                handle_element(&start, false, &mut profile, &mut section, &mut rule)?
            }
            Event::Empty(start) => {
                handle_element(&start, true, &mut profile, &mut section, &mut rule)?
            }

            Event::End(end) => match end.local_name().as_ref() {
                b"profile" => {
                    if let Some(done) = profile.take() {
                        profiles.push(done);
                    }
                }
                b"rule" => {
                    let done = rule
                        .take()
                        .ok_or_else(|| RuleError::Format("stray </rule>".to_string()))?;
                    match section.as_mut() {
                        Some((_, rules)) => rules.push(done),
                        None => {
                            return Err(RuleError::Format(
                                "<rule> outside an attribute section".to_string(),
                            ))
                        }
                    }
                }
                name if SECTIONS.contains(&String::from_utf8_lossy(name).as_ref()) => {
                    if let (Some(done), Some(profile)) = (section.take(), profile.as_mut()) {
                        profile.sections.push(done);
                    }
                }
                _ => {}
            },

            Event::Eof => break,
            _ => {}
        }
    }

    Ok(profiles)
}

fn handle_element(
    start: &BytesStart<'_>,
    is_empty: bool,
    profile: &mut Option<ProfileSpec>,
    section: &mut Option<(String, Vec<RuleSpec>)>,
    rule: &mut Option<RuleSpec>,
) -> Result<(), RuleError> {
    match start.local_name().as_ref() {
        b"routing" => {}

        b"profile" => {
            *profile = Some(ProfileSpec {
                name: required_attr(start, "name")?,
                ..ProfileSpec::default()
            });
        }

        b"attribute" => {
            if let Some(profile) = profile.as_mut() {
                profile
                    .attributes
                    .push((required_attr(start, "name")?, required_attr(start, "value")?));
            }
        }

        b"parameter" => {
            if let Some(profile) = profile.as_mut() {
                let name = required_attr(start, "name")?;
                let default = required_attr(start, "default")?;
                let default = default.parse::<f32>().map_err(|_| {
                    RuleError::Format(format!("parameter {:?}: bad default {:?}", name, default))
                })?;
                profile.parameters.push((name, default));
            }
        }

        b"rule" => {
            let mut spec = RuleSpec {
                value: required_attr(start, "value")?,
                conditions: Vec::new(),
            };
            // The t/v shorthand stands for one <when> condition.
            if let Some(tag) = attr(start, b"t") {
                spec.conditions.push(ConditionSpec::When {
                    tag,
                    value: attr(start, b"v"),
                });
            }
            if is_empty {
                match section.as_mut() {
                    Some((_, rules)) => rules.push(spec),
                    None => {
                        return Err(RuleError::Format(
                            "<rule> outside an attribute section".to_string(),
                        ))
                    }
                }
            } else {
                *rule = Some(spec);
            }
        }

        b"when" | b"unless" => {
            let tag = required_attr(start, "t")?;
            let value = attr(start, b"v");
            let condition = if start.local_name().as_ref() == b"when" {
                ConditionSpec::When { tag, value }
            } else {
                ConditionSpec::Unless { tag, value }
            };
            match rule.as_mut() {
                Some(rule) => rule.conditions.push(condition),
                None => {
                    return Err(RuleError::Format(
                        "condition element outside a <rule>".to_string(),
                    ))
                }
            }
        }

        b"le" | b"ge" => {
            let a = required_attr(start, "a")?;
            let b = required_attr(start, "b")?;
            let condition = if start.local_name().as_ref() == b"le" {
                ConditionSpec::Le { a, b }
            } else {
                ConditionSpec::Ge { a, b }
            };
            match rule.as_mut() {
                Some(rule) => rule.conditions.push(condition),
                None => {
                    return Err(RuleError::Format(
                        "comparison element outside a <rule>".to_string(),
                    ))
                }
            }
        }

        name if SECTIONS.contains(&String::from_utf8_lossy(name).as_ref()) => {
            let name = String::from_utf8_lossy(name).to_string();
            if is_empty {
                if let Some(profile) = profile.as_mut() {
                    profile.sections.push((name, Vec::new()));
                }
            } else {
                *section = Some((name, Vec::new()));
            }
        }

        other => {
            log::warn!(
                "skipping unknown rules element <{}>",
                String::from_utf8_lossy(other)
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_profiles_sections_and_conditions() {
        let doc = r#"
            <routing version="1">
              <profile name="car">
                <attribute name="maxSpeed" value="36"/>
                <parameter name="short_way" default="0"/>
                <speed>
                  <rule value="25" t="highway" v="motorway"/>
                  <rule value=":maxspeed">
                    <when t="maxspeed"/>
                    <unless t="access" v="no"/>
                    <ge a=":maxspeed" b="1"/>
                  </rule>
                </speed>
                <priority/>
              </profile>
            </routing>
        "#;

        let profiles = parse_document(doc).unwrap();
        assert_eq!(profiles.len(), 1);

        let car = &profiles[0];
        assert_eq!(car.name, "car");
        assert_eq!(car.attributes, vec![("maxSpeed".to_string(), "36".to_string())]);
        assert_eq!(car.parameters, vec![("short_way".to_string(), 0.0)]);
        assert_eq!(car.sections.len(), 2);

        let (name, rules) = &car.sections[0];
        assert_eq!(name, "speed");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].value, "25");
        assert_eq!(
            rules[0].conditions,
            vec![ConditionSpec::When {
                tag: "highway".to_string(),
                value: Some("motorway".to_string())
            }]
        );
        assert_eq!(
            rules[1].conditions,
            vec![
                ConditionSpec::When {
                    tag: "maxspeed".to_string(),
                    value: None
                },
                ConditionSpec::Unless {
                    tag: "access".to_string(),
                    value: Some("no".to_string())
                },
                ConditionSpec::Ge {
                    a: ":maxspeed".to_string(),
                    b: "1".to_string()
                },
            ]
        );

        assert_eq!(car.sections[1], ("priority".to_string(), vec![]));
    }

    #[test]
    fn rule_outside_section_is_an_error() {
        let doc = r#"<routing><profile name="x"><rule value="1"/></profile></routing>"#;
        assert!(matches!(parse_document(doc), Err(RuleError::Format(_))));
    }

    #[test]
    fn rule_without_value_is_an_error() {
        let doc = r#"<routing><profile name="x"><speed><rule t="highway"/></speed></profile></routing>"#;
        assert!(matches!(parse_document(doc), Err(RuleError::Format(_))));
    }

    #[test]
    fn unknown_elements_are_skipped() {
        let doc = r#"
            <routing>
              <shiny/>
              <profile name="x"><speed><rule value="1"/></speed></profile>
            </routing>
        "#;
        let profiles = parse_document(doc).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].sections[0].1.len(), 1);
    }
}
