// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Declarative evaluation of road attributes.
//!
//! A [RuleSet] holds one [VehicleProfile] per travel mode. Each
//! profile compiles its rule document into ordered per-attribute rule
//! lists whose conditions are bitsets over a profile-wide (tag, value)
//! registry. Map regions bring their own numeric tag codes; binding a
//! region translates those codes into the profile's id space, so a
//! road's tag set becomes one bitset lookup per rule.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::map::{RoadObject, RouteRegion};

mod xml;

pub use xml::RuleError;

/// Thresholds shared between turn costs and turn classification, in
/// degrees of bearing change.
pub(crate) const TURN_DEGREE: f64 = 45.0;
pub(crate) const UTURN_DEGREE: f64 = 120.0;

/// A growable bitset over registry ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct BitSet(Vec<u64>);

impl BitSet {
    pub(crate) fn set(&mut self, bit: u32) {
        let word = (bit / 64) as usize;
        if word >= self.0.len() {
            self.0.resize(word + 1, 0);
        }
        self.0[word] |= 1 << (bit % 64);
    }

    fn word(&self, index: usize) -> u64 {
        self.0.get(index).copied().unwrap_or(0)
    }

    pub(crate) fn is_subset_of(&self, other: &BitSet) -> bool {
        self.0
            .iter()
            .enumerate()
            .all(|(i, w)| w & !other.word(i) == 0)
    }

    pub(crate) fn intersects(&self, other: &BitSet) -> bool {
        self.0.iter().enumerate().any(|(i, w)| w & other.word(i) != 0)
    }
}

/// One interned (tag, value) pair. Where the value parses as a
/// number it is kept pre-parsed; speed-like tags normalize to m/s.
#[derive(Debug, Clone)]
struct RegistryEntry {
    tag: String,
    value: String,
    float_value: Option<f32>,
}

/// Numbers in tag values: `maxspeed`-family tags normalize to m/s
/// ("none" means unposted, taken as 40 m/s; "mph" converts), other
/// tags parse as plain floats.
fn parse_tag_float(tag: &str, value: &str) -> Option<f32> {
    if value.is_empty() {
        return None;
    }
    if tag.contains("maxspeed") {
        if value == "none" {
            return Some(40.0);
        }
        if let Some(mph) = value.strip_suffix(" mph").or_else(|| value.strip_suffix("mph")) {
            return mph.trim().parse::<f32>().ok().map(|v| v * 0.44704);
        }
        return value.parse::<f32>().ok().map(|v| v / 3.6);
    }
    value.parse::<f32>().ok()
}

#[derive(Debug, Default)]
struct TagRegistry {
    entries: Vec<RegistryEntry>,
    by_pair: HashMap<(String, String), u32>,
}

impl TagRegistry {
    fn intern(&mut self, tag: &str, value: &str) -> u32 {
        if let Some(&id) = self.by_pair.get(&(tag.to_string(), value.to_string())) {
            return id;
        }
        let id = self.entries.len() as u32;
        self.entries.push(RegistryEntry {
            tag: tag.to_string(),
            value: value.to_string(),
            float_value: parse_tag_float(tag, value),
        });
        self.by_pair.insert((tag.to_string(), value.to_string()), id);
        id
    }

    fn get(&self, tag: &str, value: &str) -> Option<u32> {
        self.by_pair.get(&(tag.to_string(), value.to_string())).copied()
    }
}

/// Late-bound rule output or expression operand.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    Literal(f32),
    /// `$name`: substituted from profile configuration.
    Parameter(String),
    /// `:tag`: the numeric value of the road's `tag`, if present.
    TagLookup(String),
}

impl Operand {
    pub(crate) fn parse(text: &str) -> Result<Self, RuleError> {
        if let Some(name) = text.strip_prefix('$') {
            Ok(Self::Parameter(name.to_string()))
        } else if let Some(tag) = text.strip_prefix(':') {
            Ok(Self::TagLookup(tag.to_string()))
        } else {
            text.parse::<f32>()
                .map(Self::Literal)
                .map_err(|_| RuleError::Format(format!("not a number: {:?}", text)))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Comparison {
    LessOrEqual,
    GreaterOrEqual,
}

#[derive(Debug, Clone)]
pub(crate) struct Expression {
    pub(crate) left: Operand,
    pub(crate) right: Operand,
    pub(crate) comparison: Comparison,
}

#[derive(Debug, Clone)]
pub(crate) struct AttributeRule {
    require: BitSet,
    exclude: BitSet,
    /// (tag, must-exist) free-standing conditions.
    tag_conditions: Vec<(String, bool)>,
    expressions: Vec<Expression>,
    value: Operand,
}

/// An ordered rule list for one attribute; first match wins.
#[derive(Debug, Clone, Default)]
pub(crate) struct AttributeContext {
    rules: Vec<AttributeRule>,
}

/// A road's tag set resolved into a profile's id space.
#[derive(Debug, Clone, Default)]
pub(crate) struct TagSet {
    bits: BitSet,
    ids: Vec<u32>,
}

/// The translation from one map region's rule codes into a profile's
/// id space. Region pairs unknown to the profile registry extend the
/// space locally; rule conditions only ever reference registry ids,
/// so extension bits can never satisfy or break a condition bitset.
#[derive(Debug)]
pub(crate) struct RegionRules {
    /// Region-local 1-based rule id → combined id.
    translation: Vec<u32>,
    extension: Vec<RegistryEntry>,
}

/// Per-query parameter values: profile defaults merged with caller
/// overrides.
pub(crate) type Params = HashMap<String, f32>;

/// A compiled routing profile: attribute rule lists, configuration
/// attributes and parameter defaults for one travel mode.
#[derive(Debug)]
pub struct VehicleProfile {
    pub name: String,
    attributes: HashMap<String, String>,
    parameters: HashMap<String, f32>,
    registry: TagRegistry,
    access: AttributeContext,
    oneway: AttributeContext,
    speed: AttributeContext,
    priority: AttributeContext,
    obstacle: AttributeContext,
    obstacle_time: AttributeContext,
}

impl VehicleProfile {
    /// A raw configuration attribute, as written in the document.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn float_attribute(&self, name: &str, default: f32) -> f32 {
        self.attribute(name)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    pub fn min_speed(&self) -> f32 {
        self.float_attribute("minSpeed", 0.28)
    }

    pub fn default_speed(&self) -> f32 {
        self.float_attribute("defaultSpeed", 10.0)
    }

    pub fn max_speed(&self) -> f32 {
        self.float_attribute("maxSpeed", 40.0)
    }

    /// Profile parameter defaults merged with caller overrides.
    pub(crate) fn build_params(&self, overrides: &HashMap<String, f32>) -> Params {
        let mut params = self.parameters.clone();
        for (k, v) in overrides {
            params.insert(k.clone(), *v);
        }
        params
    }

    /// Builds the translation table for one map region. Called once
    /// per region per routing context.
    pub(crate) fn bind_region(&self, region: &RouteRegion) -> RegionRules {
        let mut binding = RegionRules {
            translation: Vec::with_capacity(region.rules().len()),
            extension: Vec::new(),
        };
        for rule in region.rules() {
            let id = match self.registry.get(&rule.tag, &rule.value) {
                Some(id) => id,
                None => {
                    let id = self.registry.entries.len() + binding.extension.len();
                    binding.extension.push(RegistryEntry {
                        tag: rule.tag.clone(),
                        value: rule.value.clone(),
                        float_value: parse_tag_float(&rule.tag, &rule.value),
                    });
                    id as u32
                }
            };
            binding.translation.push(id);
        }
        binding
    }

    fn entry<'a>(&'a self, binding: &'a RegionRules, id: u32) -> &'a RegistryEntry {
        let id = id as usize;
        if id < self.registry.entries.len() {
            &self.registry.entries[id]
        } else {
            &binding.extension[id - self.registry.entries.len()]
        }
    }

    /// Resolves region-local rule codes into a [TagSet].
    pub(crate) fn resolve(&self, binding: &RegionRules, codes: &[u32]) -> TagSet {
        let mut tags = TagSet::default();
        for &code in codes {
            if let Some(&id) = binding.translation.get((code as usize).wrapping_sub(1)) {
                tags.bits.set(id);
                tags.ids.push(id);
            }
        }
        tags
    }

    pub(crate) fn resolve_road(&self, binding: &RegionRules, road: &RoadObject) -> TagSet {
        self.resolve(binding, &road.types)
    }

    fn lookup_tag_float(&self, binding: &RegionRules, tags: &TagSet, tag: &str) -> Option<f32> {
        tags.ids.iter().find_map(|&id| {
            let entry = self.entry(binding, id);
            if entry.tag == tag {
                entry.float_value
            } else {
                None
            }
        })
    }

    fn operand_value(
        &self,
        operand: &Operand,
        binding: &RegionRules,
        tags: &TagSet,
        params: &Params,
    ) -> Option<f32> {
        match operand {
            Operand::Literal(v) => Some(*v),
            Operand::Parameter(name) => params.get(name).copied(),
            Operand::TagLookup(tag) => self.lookup_tag_float(binding, tags, tag),
        }
    }

    /// Evaluates an attribute context: the first matching rule's
    /// value, or `None` ("missing"). Zero is a valid value and is
    /// never used for absence.
    fn evaluate(
        &self,
        context: &AttributeContext,
        binding: &RegionRules,
        tags: &TagSet,
        params: &Params,
    ) -> Option<f32> {
        'rules: for rule in &context.rules {
            if !rule.require.is_subset_of(&tags.bits) {
                continue;
            }
            if rule.exclude.intersects(&tags.bits) {
                continue;
            }
            for (tag, must_exist) in &rule.tag_conditions {
                let exists = tags
                    .ids
                    .iter()
                    .any(|&id| self.entry(binding, id).tag == *tag);
                if exists != *must_exist {
                    continue 'rules;
                }
            }
            for expression in &rule.expressions {
                let left = self.operand_value(&expression.left, binding, tags, params);
                let right = self.operand_value(&expression.right, binding, tags, params);
                let (Some(left), Some(right)) = (left, right) else {
                    // An expression over an absent operand cannot
                    // hold; the rule does not match.
                    continue 'rules;
                };
                let holds = match expression.comparison {
                    Comparison::LessOrEqual => left <= right,
                    Comparison::GreaterOrEqual => left >= right,
                };
                if !holds {
                    continue 'rules;
                }
            }
            return self.operand_value(&rule.value, binding, tags, params);
        }
        None
    }

    /// Whether the road may be traversed at all; a negative access
    /// value blocks it, a missing one permits it.
    pub(crate) fn allowed(&self, binding: &RegionRules, tags: &TagSet, params: &Params) -> bool {
        match self.evaluate(&self.access, binding, tags, params) {
            Some(value) => value >= 0.0,
            None => true,
        }
    }

    /// Travel direction: 0 = both ways, 1 = forward (increasing
    /// vertex index) only, -1 = backward only.
    pub(crate) fn oneway(&self, binding: &RegionRules, tags: &TagSet, params: &Params) -> i32 {
        match self.evaluate(&self.oneway, binding, tags, params) {
            Some(value) if value > 0.5 => 1,
            Some(value) if value < -0.5 => -1,
            _ => 0,
        }
    }

    /// Travel speed in m/s, clamped into the profile's speed band.
    pub(crate) fn speed(&self, binding: &RegionRules, tags: &TagSet, params: &Params) -> f32 {
        let speed = self
            .evaluate(&self.speed, binding, tags, params)
            .unwrap_or_else(|| self.default_speed());
        speed.clamp(self.min_speed(), self.max_speed())
    }

    /// Relative preference for the road; multiplies the speed.
    pub(crate) fn priority(&self, binding: &RegionRules, tags: &TagSet, params: &Params) -> f32 {
        self.evaluate(&self.priority, binding, tags, params)
            .unwrap_or(1.0)
    }

    /// Routing weight of a point obstacle, in seconds; negative means
    /// impassable. Missing means no obstacle.
    pub(crate) fn obstacle(
        &self,
        binding: &RegionRules,
        point_tags: &TagSet,
        params: &Params,
    ) -> Option<f32> {
        self.evaluate(&self.obstacle, binding, point_tags, params)
    }

    /// Real crossing time of a point obstacle, in seconds.
    pub(crate) fn obstacle_time(
        &self,
        binding: &RegionRules,
        point_tags: &TagSet,
        params: &Params,
    ) -> Option<f32> {
        self.evaluate(&self.obstacle_time, binding, point_tags, params)
    }

    /// Whether the tag set marks a roundabout carriageway.
    pub(crate) fn is_roundabout(&self, binding: &RegionRules, tags: &TagSet) -> bool {
        tags.ids.iter().any(|&id| {
            let entry = self.entry(binding, id);
            entry.tag == "junction" && (entry.value == "roundabout" || entry.value == "circular")
        })
    }

    /// Whether the point tag set marks a traffic signal.
    pub(crate) fn is_traffic_signal(&self, binding: &RegionRules, tags: &TagSet) -> bool {
        tags.ids.iter().any(|&id| {
            let entry = self.entry(binding, id);
            entry.tag == "highway" && entry.value == "traffic_signals"
        })
    }

    /// Cost of the transition between two roads at a junction.
    ///
    /// Signalled junctions are free (the signal already costs through
    /// the obstacle attributes); entering a roundabout costs a flat
    /// configured amount; otherwise the bearing change decides:
    /// above [UTURN_DEGREE] the larger turn penalty applies, above
    /// [TURN_DEGREE] the side's penalty, below it nothing.
    pub(crate) fn transition_cost(
        &self,
        bearing_in: f64,
        bearing_out: f64,
        entering_roundabout: bool,
        via_signal: bool,
    ) -> f32 {
        if via_signal {
            return 0.0;
        }
        if entering_roundabout {
            return self.float_attribute("roundaboutPenalty", 2.0);
        }

        let left = self.float_attribute("leftTurnPenalty", 0.0);
        let right = self.float_attribute("rightTurnPenalty", 0.0);
        let delta = crate::geo::normalize_degrees(bearing_out - bearing_in);
        if delta.abs() > UTURN_DEGREE {
            left.max(right)
        } else if delta.abs() >= TURN_DEGREE {
            if delta > 0.0 {
                right
            } else {
                left
            }
        } else {
            0.0
        }
    }
}

/// A parsed rules document: one profile per travel mode.
#[derive(Debug)]
pub struct RuleSet {
    profiles: Vec<VehicleProfile>,
}

impl RuleSet {
    /// Parses a rules document.
    pub fn from_str(document: &str) -> Result<Self, RuleError> {
        let specs = xml::parse_document(document)?;
        let profiles = specs.into_iter().map(compile_profile).collect::<Result<_, _>>()?;
        Ok(Self { profiles })
    }

    /// The built-in rules document with `car`, `bicycle` and
    /// `pedestrian` profiles, compiled once per process.
    pub fn default_rules() -> &'static RuleSet {
        static DEFAULT: OnceLock<RuleSet> = OnceLock::new();
        DEFAULT.get_or_init(|| {
            Self::from_str(include_str!("routing.xml"))
                .expect("embedded rules document must be valid")
        })
    }

    pub fn profile(&self, name: &str) -> Option<&VehicleProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn profiles(&self) -> &[VehicleProfile] {
        &self.profiles
    }
}

fn compile_profile(spec: xml::ProfileSpec) -> Result<VehicleProfile, RuleError> {
    let mut profile = VehicleProfile {
        name: spec.name,
        attributes: spec.attributes.into_iter().collect(),
        parameters: spec.parameters.into_iter().collect(),
        registry: TagRegistry::default(),
        access: AttributeContext::default(),
        oneway: AttributeContext::default(),
        speed: AttributeContext::default(),
        priority: AttributeContext::default(),
        obstacle: AttributeContext::default(),
        obstacle_time: AttributeContext::default(),
    };

    for (section, rules) in spec.sections {
        let mut context = AttributeContext::default();
        for rule_spec in rules {
            context
                .rules
                .push(compile_rule(rule_spec, &mut profile.registry)?);
        }
        match section.as_str() {
            "access" => profile.access = context,
            "oneway" => profile.oneway = context,
            "speed" => profile.speed = context,
            "priority" => profile.priority = context,
            "obstacle" => profile.obstacle = context,
            "obstacle_time" => profile.obstacle_time = context,
            other => {
                return Err(RuleError::Format(format!(
                    "unknown attribute section: {:?}",
                    other
                )))
            }
        }
    }

    Ok(profile)
}

fn compile_rule(
    spec: xml::RuleSpec,
    registry: &mut TagRegistry,
) -> Result<AttributeRule, RuleError> {
    let mut rule = AttributeRule {
        require: BitSet::default(),
        exclude: BitSet::default(),
        tag_conditions: Vec::new(),
        expressions: Vec::new(),
        value: Operand::parse(&spec.value)?,
    };

    for condition in spec.conditions {
        match condition {
            xml::ConditionSpec::When { tag, value: Some(value) } => {
                rule.require.set(registry.intern(&tag, &value));
            }
            xml::ConditionSpec::When { tag, value: None } => {
                rule.tag_conditions.push((tag, true));
            }
            xml::ConditionSpec::Unless { tag, value: Some(value) } => {
                rule.exclude.set(registry.intern(&tag, &value));
            }
            xml::ConditionSpec::Unless { tag, value: None } => {
                rule.tag_conditions.push((tag, false));
            }
            xml::ConditionSpec::Le { a, b } => rule.expressions.push(Expression {
                left: Operand::parse(&a)?,
                right: Operand::parse(&b)?,
                comparison: Comparison::LessOrEqual,
            }),
            xml::ConditionSpec::Ge { a, b } => rule.expressions.push(Expression {
                left: Operand::parse(&a)?,
                right: Operand::parse(&b)?,
                comparison: Comparison::GreaterOrEqual,
            }),
        }
    }

    Ok(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::EncodingRule;

    /// A region-like rule table for tests, bypassing a map file.
    fn test_region(rules: &[(&str, &str)]) -> RouteRegion {
        RouteRegion {
            name: "test".to_string(),
            rules: rules
                .iter()
                .map(|(t, v)| EncodingRule {
                    tag: t.to_string(),
                    value: v.to_string(),
                })
                .collect(),
            subregions: Vec::new(),
            base_subregions: Vec::new(),
        }
    }

    const TEST_RULES: &str = r#"
        <routing version="1">
          <profile name="cat">
            <attribute name="defaultSpeed" value="5"/>
            <attribute name="maxSpeed" value="30"/>
            <attribute name="leftTurnPenalty" value="6"/>
            <attribute name="rightTurnPenalty" value="2"/>
            <attribute name="roundaboutPenalty" value="4"/>
            <parameter name="heavy" default="0"/>
            <access>
              <rule value="-1" t="access" v="no"/>
              <rule value="-1">
                <when t="maxweight"/>
                <ge a="$heavy" b="1"/>
              </rule>
            </access>
            <oneway>
              <rule value="1" t="oneway" v="yes"/>
              <rule value="-1" t="oneway" v="-1"/>
            </oneway>
            <speed>
              <rule value=":maxspeed"><when t="maxspeed"/></rule>
              <rule value="25" t="highway" v="motorway"/>
              <rule value="12.5" t="highway" v="residential">
                <unless t="surface" v="gravel"/>
              </rule>
              <rule value="8" t="highway" v="residential"/>
              <rule value="0" t="highway" v="construction"/>
            </speed>
            <priority>
              <rule value="0.5" t="highway" v="residential"/>
            </priority>
            <obstacle>
              <rule value="-1" t="barrier" v="gate"/>
              <rule value="25" t="highway" v="traffic_signals"/>
            </obstacle>
            <obstacle_time>
              <rule value="25" t="highway" v="traffic_signals"/>
            </obstacle_time>
          </profile>
        </routing>
    "#;

    fn cat_profile() -> (RuleSet, RouteRegion) {
        let rules = RuleSet::from_str(TEST_RULES).unwrap();
        let region = test_region(&[
            ("highway", "motorway"),      // 1
            ("highway", "residential"),   // 2
            ("oneway", "yes"),            // 3
            ("access", "no"),             // 4
            ("surface", "gravel"),        // 5
            ("maxspeed", "90"),           // 6
            ("barrier", "gate"),          // 7
            ("highway", "traffic_signals"), // 8
            ("maxweight", "3.5"),         // 9
            ("junction", "roundabout"),   // 10
        ]);
        (rules, region)
    }

    #[test]
    fn first_matching_rule_wins() {
        let (rules, region) = cat_profile();
        let profile = rules.profile("cat").unwrap();
        let binding = profile.bind_region(&region);
        let params = profile.build_params(&HashMap::new());

        // maxspeed wins over the highway class: 90 km/h = 25 m/s.
        let tags = profile.resolve(&binding, &[1, 6]);
        assert_eq!(profile.speed(&binding, &tags, &params), 25.0);

        let tags = profile.resolve(&binding, &[1]);
        assert_eq!(profile.speed(&binding, &tags, &params), 25.0);

        let tags = profile.resolve(&binding, &[2]);
        assert_eq!(profile.speed(&binding, &tags, &params), 12.5);
    }

    #[test]
    fn exclusions_fall_through_to_later_rules() {
        let (rules, region) = cat_profile();
        let profile = rules.profile("cat").unwrap();
        let binding = profile.bind_region(&region);
        let params = profile.build_params(&HashMap::new());

        let tags = profile.resolve(&binding, &[2, 5]);
        assert_eq!(profile.speed(&binding, &tags, &params), 8.0);
    }

    #[test]
    fn missing_is_not_zero() {
        let (rules, region) = cat_profile();
        let profile = rules.profile("cat").unwrap();
        let binding = profile.bind_region(&region);
        let params = profile.build_params(&HashMap::new());

        // No speed rule matches: the default applies, not zero.
        let tags = profile.resolve(&binding, &[3]);
        assert_eq!(profile.speed(&binding, &tags, &params), 5.0);

        // An explicit zero from a rule is a real value.
        let region0 = test_region(&[("highway", "construction")]);
        let binding0 = profile.bind_region(&region0);
        let tags0 = profile.resolve(&binding0, &[1]);
        assert_eq!(
            profile.evaluate(&profile.speed, &binding0, &tags0, &params),
            Some(0.0)
        );
    }

    #[test]
    fn access_and_oneway() {
        let (rules, region) = cat_profile();
        let profile = rules.profile("cat").unwrap();
        let binding = profile.bind_region(&region);
        let params = profile.build_params(&HashMap::new());

        let open = profile.resolve(&binding, &[2]);
        assert!(profile.allowed(&binding, &open, &params));
        let closed = profile.resolve(&binding, &[2, 4]);
        assert!(!profile.allowed(&binding, &closed, &params));

        assert_eq!(profile.oneway(&binding, &profile.resolve(&binding, &[3]), &params), 1);
        assert_eq!(profile.oneway(&binding, &open, &params), 0);
    }

    #[test]
    fn parameterized_rule_activates_with_override() {
        let (rules, region) = cat_profile();
        let profile = rules.profile("cat").unwrap();
        let binding = profile.bind_region(&region);

        let tags = profile.resolve(&binding, &[2, 9]);

        let defaults = profile.build_params(&HashMap::new());
        assert!(profile.allowed(&binding, &tags, &defaults));

        let heavy = profile.build_params(&HashMap::from([("heavy".to_string(), 1.0)]));
        assert!(!profile.allowed(&binding, &tags, &heavy));
    }

    #[test]
    fn obstacles_and_signals() {
        let (rules, region) = cat_profile();
        let profile = rules.profile("cat").unwrap();
        let binding = profile.bind_region(&region);
        let params = profile.build_params(&HashMap::new());

        let gate = profile.resolve(&binding, &[7]);
        assert_eq!(profile.obstacle(&binding, &gate, &params), Some(-1.0));

        let signal = profile.resolve(&binding, &[8]);
        assert_eq!(profile.obstacle(&binding, &signal, &params), Some(25.0));
        assert!(profile.is_traffic_signal(&binding, &signal));
        assert!(!profile.is_traffic_signal(&binding, &gate));

        let nothing = profile.resolve(&binding, &[1]);
        assert_eq!(profile.obstacle(&binding, &nothing, &params), None);
    }

    #[test]
    fn transition_costs() {
        let (rules, _) = cat_profile();
        let profile = rules.profile("cat").unwrap();

        // Signals suppress the turn cost entirely.
        assert_eq!(profile.transition_cost(0.0, 90.0, false, true), 0.0);
        // Roundabout entry is a flat cost.
        assert_eq!(profile.transition_cost(0.0, 10.0, true, false), 4.0);
        // Right turn, left turn, straight, near-U-turn.
        assert_eq!(profile.transition_cost(0.0, 90.0, false, false), 2.0);
        assert_eq!(profile.transition_cost(90.0, 0.0, false, false), 6.0);
        assert_eq!(profile.transition_cost(350.0, 10.0, false, false), 0.0);
        assert_eq!(profile.transition_cost(0.0, 175.0, false, false), 6.0);
    }

    #[test]
    fn unknown_region_pairs_extend_without_clashing() {
        let (rules, _) = cat_profile();
        let profile = rules.profile("cat").unwrap();
        let region = test_region(&[("leisure", "park"), ("highway", "motorway")]);
        let binding = profile.bind_region(&region);
        let params = profile.build_params(&HashMap::new());

        let tags = profile.resolve(&binding, &[1, 2]);
        // The unknown pair neither blocks nor matches anything...
        assert!(profile.allowed(&binding, &tags, &params));
        // ...while the known pair still resolves normally.
        assert_eq!(profile.speed(&binding, &tags, &params), 25.0);
    }

    #[test]
    fn default_rules_compile() {
        let rules = RuleSet::default_rules();
        assert!(rules.profile("car").is_some());
        assert!(rules.profile("bicycle").is_some());
        assert!(rules.profile("pedestrian").is_some());
        assert!(rules.profile("hovercraft").is_none());
    }
}
