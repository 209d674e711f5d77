//! Uniform type inference and dispatch planning.
//!
//! Callers hand us loosely structured values (numbers, booleans, strings,
//! nested sequences and maps) and we turn them into a flat list of typed
//! bindings, each carrying the GLSL name it resolves to and the upload
//! method it must be dispatched with. The flattening rules mirror what
//! shader authors expect from a scripting front-end:
//!
//! * a lone number becomes a `float`;
//! * a sequence of 2 to 4 numbers becomes `vec2`/`vec3`/`vec4`;
//! * a longer numeric sequence becomes a `float` array bound at `name[0]`;
//! * a sequence of small numeric sequences becomes per-element `vecN`
//!   bindings at `name[i]`;
//! * strings name textures, and a sequence of strings names a sampler array;
//! * maps recurse with dotted names, and sequences of maps recurse with
//!   indexed names, matching GLSL struct and struct-array syntax.
//!
//! Shapes outside these rules classify as [`UniformType::Unsupported`] so the
//! caller can surface them instead of silently dropping the value.

use smallvec::{smallvec, SmallVec};

/// A loosely typed uniform value as supplied by the embedding application.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Number(f64),
    Bool(bool),
    Str(String),
    List(Vec<UniformValue>),
    Object(Vec<(String, UniformValue)>),
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Number(f64::from(v))
    }
}

impl From<f64> for UniformValue {
    fn from(v: f64) -> Self {
        UniformValue::Number(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Number(f64::from(v))
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl<'a> From<&'a str> for UniformValue {
    fn from(v: &'a str) -> Self {
        UniformValue::Str(v.to_string())
    }
}

impl From<String> for UniformValue {
    fn from(v: String) -> Self {
        UniformValue::Str(v)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        UniformValue::List(v.iter().map(|&f| f.into()).collect())
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        UniformValue::List(v.iter().map(|&f| f.into()).collect())
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        UniformValue::List(v.iter().map(|&f| f.into()).collect())
    }
}

impl<'a> From<&'a [f32]> for UniformValue {
    fn from(v: &'a [f32]) -> Self {
        UniformValue::List(v.iter().map(|&f| f.into()).collect())
    }
}

impl From<Vec<f32>> for UniformValue {
    fn from(v: Vec<f32>) -> Self {
        UniformValue::List(v.into_iter().map(UniformValue::from).collect())
    }
}

/// Converts parsed JSON into a uniform value tree. Object key order is
/// preserved, so bindings come out in declaration order. JSON `null` maps to
/// an empty list, which classifies as unsupported downstream.
impl From<serde_json::Value> for UniformValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => UniformValue::List(Vec::new()),
            serde_json::Value::Bool(v) => UniformValue::Bool(v),
            serde_json::Value::Number(v) => UniformValue::Number(v.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(v) => UniformValue::Str(v),
            serde_json::Value::Array(v) => {
                UniformValue::List(v.into_iter().map(UniformValue::from).collect())
            }
            serde_json::Value::Object(v) => UniformValue::Object(
                v.into_iter().map(|(k, v)| (k, UniformValue::from(v))).collect(),
            ),
        }
    }
}

/// The GLSL type a uniform value classified as.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    FloatArray,
    Bool,
    Sampler2D,
    Sampler2DArray,
    Unsupported,
}

/// The upload entry point a binding dispatches through.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UniformMethod {
    Float1,
    FloatVec2,
    FloatVec3,
    FloatVec4,
    FloatArray,
    Int1,
}

/// The flattened payload attached to a binding.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformData {
    Floats(SmallVec<[f32; 4]>),
    Int(i32),
    Textures(Vec<String>),
    None,
}

/// One resolved binding: the GLSL name to look up, the inferred type, the
/// dispatch method and the payload to upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBinding {
    pub name: String,
    pub tp: UniformType,
    pub method: Option<UniformMethod>,
    pub data: UniformData,
}

impl UniformBinding {
    /// Converts the payload into a concrete variable ready for upload.
    /// Texture and unsupported bindings carry no directly uploadable value.
    pub fn to_variable(&self) -> Option<UniformVariable> {
        match (&self.method, &self.data) {
            (Some(UniformMethod::Float1), UniformData::Floats(v)) => {
                Some(UniformVariable::F32(v[0]))
            }
            (Some(UniformMethod::FloatVec2), UniformData::Floats(v)) => {
                Some(UniformVariable::Vector2f([v[0], v[1]]))
            }
            (Some(UniformMethod::FloatVec3), UniformData::Floats(v)) => {
                Some(UniformVariable::Vector3f([v[0], v[1], v[2]]))
            }
            (Some(UniformMethod::FloatVec4), UniformData::Floats(v)) => {
                Some(UniformVariable::Vector4f([v[0], v[1], v[2], v[3]]))
            }
            (Some(UniformMethod::FloatArray), UniformData::Floats(v)) => {
                Some(UniformVariable::FloatArray(v.to_vec()))
            }
            (Some(UniformMethod::Int1), UniformData::Int(v)) => Some(UniformVariable::I32(*v)),
            _ => None,
        }
    }
}

/// A concrete value as uploaded to the device.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformVariable {
    I32(i32),
    F32(f32),
    Vector2f([f32; 2]),
    Vector3f([f32; 3]),
    Vector4f([f32; 4]),
    FloatArray(Vec<f32>),
}

impl UniformVariable {
    pub fn uniform_type(&self) -> UniformType {
        match *self {
            UniformVariable::I32(_) => UniformType::Bool,
            UniformVariable::F32(_) => UniformType::Float,
            UniformVariable::Vector2f(_) => UniformType::Vec2,
            UniformVariable::Vector3f(_) => UniformType::Vec3,
            UniformVariable::Vector4f(_) => UniformType::Vec4,
            UniformVariable::FloatArray(_) => UniformType::FloatArray,
        }
    }
}

/// Flattens a uniform value tree into typed bindings. `prefix` carries the
/// accumulated GLSL name when recursing into maps and indexed sequences.
pub fn parse_uniforms(value: &UniformValue, prefix: Option<&str>) -> Vec<UniformBinding> {
    let mut bindings = Vec::new();

    match *value {
        UniformValue::Object(ref fields) => {
            for (k, v) in fields {
                let name = match prefix {
                    Some(prefix) => format!("{}.{}", prefix, k),
                    None => k.clone(),
                };

                classify(&name, v, &mut bindings);
            }
        }
        ref v => {
            let name = prefix.unwrap_or("").to_string();
            classify(&name, v, &mut bindings);
        }
    }

    bindings
}

fn classify(name: &str, value: &UniformValue, out: &mut Vec<UniformBinding>) {
    match *value {
        UniformValue::Number(v) => out.push(UniformBinding {
            name: name.to_string(),
            tp: UniformType::Float,
            method: Some(UniformMethod::Float1),
            data: UniformData::Floats(smallvec![v as f32]),
        }),
        UniformValue::Bool(v) => out.push(UniformBinding {
            name: name.to_string(),
            tp: UniformType::Bool,
            method: Some(UniformMethod::Int1),
            data: UniformData::Int(if v { 1 } else { 0 }),
        }),
        UniformValue::Str(ref v) => out.push(UniformBinding {
            name: name.to_string(),
            tp: UniformType::Sampler2D,
            method: None,
            data: UniformData::Textures(vec![v.clone()]),
        }),
        UniformValue::List(ref items) => classify_list(name, items, out),
        UniformValue::Object(_) => {
            out.extend(parse_uniforms(value, Some(name)));
        }
    }
}

fn classify_list(name: &str, items: &[UniformValue], out: &mut Vec<UniformBinding>) {
    if items.is_empty() {
        out.push(unsupported(name));
        return;
    }

    if items.iter().all(is_number) {
        let floats: SmallVec<[f32; 4]> = items.iter().filter_map(as_f32).collect();

        match floats.len() {
            1 => out.push(UniformBinding {
                name: name.to_string(),
                tp: UniformType::Float,
                method: Some(UniformMethod::Float1),
                data: UniformData::Floats(floats),
            }),
            2 => out.push(UniformBinding {
                name: name.to_string(),
                tp: UniformType::Vec2,
                method: Some(UniformMethod::FloatVec2),
                data: UniformData::Floats(floats),
            }),
            3 => out.push(UniformBinding {
                name: name.to_string(),
                tp: UniformType::Vec3,
                method: Some(UniformMethod::FloatVec3),
                data: UniformData::Floats(floats),
            }),
            4 => out.push(UniformBinding {
                name: name.to_string(),
                tp: UniformType::Vec4,
                method: Some(UniformMethod::FloatVec4),
                data: UniformData::Floats(floats),
            }),
            _ => out.push(UniformBinding {
                name: format!("{}[0]", name),
                tp: UniformType::FloatArray,
                method: Some(UniformMethod::FloatArray),
                data: UniformData::Floats(floats),
            }),
        }
        return;
    }

    if items.iter().all(is_string) {
        let refs = items
            .iter()
            .filter_map(|v| match *v {
                UniformValue::Str(ref s) => Some(s.clone()),
                _ => None,
            })
            .collect();

        out.push(UniformBinding {
            name: name.to_string(),
            tp: UniformType::Sampler2DArray,
            method: None,
            data: UniformData::Textures(refs),
        });
        return;
    }

    if items.iter().all(is_small_number_list) {
        for (i, inner) in items.iter().enumerate() {
            classify(&format!("{}[{}]", name, i), inner, out);
        }
        return;
    }

    if items.iter().all(is_object) {
        for (i, inner) in items.iter().enumerate() {
            out.extend(parse_uniforms(inner, Some(&format!("{}[{}]", name, i))));
        }
        return;
    }

    out.push(unsupported(name));
}

fn unsupported(name: &str) -> UniformBinding {
    UniformBinding {
        name: name.to_string(),
        tp: UniformType::Unsupported,
        method: None,
        data: UniformData::None,
    }
}

fn is_number(v: &UniformValue) -> bool {
    match *v {
        UniformValue::Number(_) => true,
        _ => false,
    }
}

fn is_string(v: &UniformValue) -> bool {
    match *v {
        UniformValue::Str(_) => true,
        _ => false,
    }
}

fn is_object(v: &UniformValue) -> bool {
    match *v {
        UniformValue::Object(_) => true,
        _ => false,
    }
}

fn is_small_number_list(v: &UniformValue) -> bool {
    match *v {
        UniformValue::List(ref inner) => {
            inner.len() >= 2 && inner.len() <= 4 && inner.iter().all(is_number)
        }
        _ => false,
    }
}

fn as_f32(v: &UniformValue) -> Option<f32> {
    match *v {
        UniformValue::Number(n) => Some(n as f32),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn obj(fields: Vec<(&str, UniformValue)>) -> UniformValue {
        UniformValue::Object(fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    #[test]
    fn scalar_number_is_float() {
        let v = obj(vec![("u_speed", 0.5f32.into())]);
        let bindings = parse_uniforms(&v, None);

        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].name, "u_speed");
        assert_eq!(bindings[0].tp, UniformType::Float);
        assert_eq!(bindings[0].method, Some(UniformMethod::Float1));
        assert_eq!(bindings[0].to_variable(), Some(UniformVariable::F32(0.5)));
    }

    #[test]
    fn one_element_list_is_float() {
        let v = obj(vec![("u_a", vec![2.0f32].into())]);
        let bindings = parse_uniforms(&v, None);

        assert_eq!(bindings[0].tp, UniformType::Float);
        assert_eq!(bindings[0].to_variable(), Some(UniformVariable::F32(2.0)));
    }

    #[test]
    fn small_lists_are_vectors() {
        let v = obj(vec![
            ("u_a", [1.0f32, 2.0].into()),
            ("u_b", [1.0f32, 2.0, 3.0].into()),
            ("u_c", [1.0f32, 2.0, 3.0, 4.0].into()),
        ]);
        let bindings = parse_uniforms(&v, None);

        assert_eq!(bindings[0].tp, UniformType::Vec2);
        assert_eq!(bindings[1].tp, UniformType::Vec3);
        assert_eq!(bindings[2].tp, UniformType::Vec4);
        assert_eq!(
            bindings[2].to_variable(),
            Some(UniformVariable::Vector4f([1.0, 2.0, 3.0, 4.0]))
        );
    }

    #[test]
    fn long_list_is_float_array_at_index_zero() {
        let v = obj(vec![("u_wave", vec![1.0f32, 2.0, 3.0, 4.0, 5.0].into())]);
        let bindings = parse_uniforms(&v, None);

        assert_eq!(bindings[0].name, "u_wave[0]");
        assert_eq!(bindings[0].tp, UniformType::FloatArray);
        assert_eq!(
            bindings[0].to_variable(),
            Some(UniformVariable::FloatArray(vec![1.0, 2.0, 3.0, 4.0, 5.0]))
        );
    }

    #[test]
    fn bool_is_int_upload() {
        let v = obj(vec![("u_on", true.into())]);
        let bindings = parse_uniforms(&v, None);

        assert_eq!(bindings[0].tp, UniformType::Bool);
        assert_eq!(bindings[0].to_variable(), Some(UniformVariable::I32(1)));
    }

    #[test]
    fn string_is_sampler() {
        let v = obj(vec![("u_tex", "wall.png".into())]);
        let bindings = parse_uniforms(&v, None);

        assert_eq!(bindings[0].tp, UniformType::Sampler2D);
        assert_eq!(
            bindings[0].data,
            UniformData::Textures(vec!["wall.png".to_string()])
        );
        assert_eq!(bindings[0].to_variable(), None);
    }

    #[test]
    fn string_list_is_sampler_array() {
        let v = obj(vec![(
            "u_frames",
            UniformValue::List(vec!["a.png".into(), "b.png".into()]),
        )]);
        let bindings = parse_uniforms(&v, None);

        assert_eq!(bindings[0].tp, UniformType::Sampler2DArray);
        assert_eq!(
            bindings[0].data,
            UniformData::Textures(vec!["a.png".to_string(), "b.png".to_string()])
        );
    }

    #[test]
    fn list_of_vectors_flattens_per_index() {
        let v = obj(vec![(
            "u_pts",
            UniformValue::List(vec![[0.0f32, 1.0].into(), [2.0f32, 3.0].into()]),
        )]);
        let bindings = parse_uniforms(&v, None);

        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].name, "u_pts[0]");
        assert_eq!(bindings[0].tp, UniformType::Vec2);
        assert_eq!(bindings[1].name, "u_pts[1]");
        assert_eq!(
            bindings[1].to_variable(),
            Some(UniformVariable::Vector2f([2.0, 3.0]))
        );
    }

    #[test]
    fn nested_object_uses_dotted_names() {
        let v = obj(vec![(
            "u_light",
            obj(vec![
                ("intensity", 0.8f32.into()),
                ("direction", [0.0f32, 1.0, 0.0].into()),
            ]),
        )]);
        let bindings = parse_uniforms(&v, None);

        assert_eq!(bindings[0].name, "u_light.intensity");
        assert_eq!(bindings[0].tp, UniformType::Float);
        assert_eq!(bindings[1].name, "u_light.direction");
        assert_eq!(bindings[1].tp, UniformType::Vec3);
    }

    #[test]
    fn list_of_objects_indexes_then_dots() {
        let v = obj(vec![(
            "u_lights",
            UniformValue::List(vec![
                obj(vec![("power", 1.0f32.into())]),
                obj(vec![("power", 2.0f32.into())]),
            ]),
        )]);
        let bindings = parse_uniforms(&v, None);

        assert_eq!(bindings[0].name, "u_lights[0].power");
        assert_eq!(bindings[1].name, "u_lights[1].power");
    }

    #[test]
    fn declaration_order_is_preserved() {
        let v = obj(vec![
            ("z_last", 1.0f32.into()),
            ("a_first", 2.0f32.into()),
            ("m_mid", 3.0f32.into()),
        ]);
        let bindings = parse_uniforms(&v, None);

        let names: Vec<&str> = bindings.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["z_last", "a_first", "m_mid"]);
    }

    #[test]
    fn mixed_list_is_unsupported() {
        let v = obj(vec![(
            "u_bad",
            UniformValue::List(vec![1.0f32.into(), "a.png".into()]),
        )]);
        let bindings = parse_uniforms(&v, None);

        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].tp, UniformType::Unsupported);
    }

    #[test]
    fn empty_list_is_unsupported() {
        let v = obj(vec![("u_bad", UniformValue::List(Vec::new()))]);
        let bindings = parse_uniforms(&v, None);

        assert_eq!(bindings[0].tp, UniformType::Unsupported);
    }

    #[test]
    fn oversized_inner_vector_is_unsupported() {
        let v = obj(vec![(
            "u_bad",
            UniformValue::List(vec![
                vec![1.0f32, 2.0, 3.0, 4.0, 5.0].into(),
                vec![1.0f32, 2.0, 3.0, 4.0, 5.0].into(),
            ]),
        )]);
        let bindings = parse_uniforms(&v, None);

        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].tp, UniformType::Unsupported);
    }

    #[test]
    fn json_object_converts_in_declaration_order() {
        let parsed: serde_json::Value =
            serde_json::from_str(r#"{"u_b": 1.5, "u_a": [1, 2], "u_t": "dirt.png"}"#)
                .unwrap();
        let bindings = parse_uniforms(&UniformValue::from(parsed), None);

        assert_eq!(bindings[0].name, "u_b");
        assert_eq!(bindings[0].tp, UniformType::Float);
        assert_eq!(bindings[1].name, "u_a");
        assert_eq!(bindings[1].tp, UniformType::Vec2);
        assert_eq!(bindings[2].tp, UniformType::Sampler2D);
    }
}
