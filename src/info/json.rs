//! # JSON 序列化
//!
//! - `pretty_json`: 确定性的可读 JSON（键排序、标量数组单行、矩阵每行一行）
//! - `from_json`: 反序列化任意信息层类型
//! - `nalgebra` 矩阵/向量的 serde 适配（矩阵按行序列化为嵌套数组）
//!
//! 数字使用 serde_json 的最短往返表示，因此输出解析后再次序列化逐字节一致。
//!
//! ## 依赖关系
//! - 被 `info/` 的所有类型及命令行导出使用
//! - 使用 `serde_json`

use crate::error::Result;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

const INDENT: &str = "  ";

/// 序列化为确定性的可读 JSON 文本
pub fn pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    let mut out = String::new();
    write_value(&value, 0, &mut out)?;
    Ok(out)
}

/// 从 JSON 文本反序列化
pub fn from_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    Ok(serde_json::from_str(text)?)
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn write_value(value: &Value, depth: usize, out: &mut String) -> Result<()> {
    match value {
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Array(items) if items.iter().all(is_scalar) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&serde_json::to_string(item)?);
            }
            out.push(']');
        }
        Value::Array(items) => {
            out.push_str("[\n");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                }
                out.push_str(&INDENT.repeat(depth + 1));
                write_value(item, depth + 1, out)?;
            }
            out.push('\n');
            out.push_str(&INDENT.repeat(depth));
            out.push(']');
        }
        Value::Object(map) if map.is_empty() => out.push_str("{}"),
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push_str("{\n");
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                }
                out.push_str(&INDENT.repeat(depth + 1));
                out.push_str(&serde_json::to_string(key)?);
                out.push_str(": ");
                write_value(&map[key.as_str()], depth + 1, out)?;
            }
            out.push('\n');
            out.push_str(&INDENT.repeat(depth));
            out.push('}');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

fn rows<T: nalgebra::Scalar + Copy + Default>(m: &nalgebra::Matrix3<T>) -> [[T; 3]; 3] {
    let mut r = [[T::default(); 3]; 3];
    for (i, row) in r.iter_mut().enumerate() {
        for (j, x) in row.iter_mut().enumerate() {
            *x = m[(i, j)];
        }
    }
    r
}

fn from_rows<T: nalgebra::Scalar + Copy>(r: [[T; 3]; 3]) -> nalgebra::Matrix3<T> {
    nalgebra::Matrix3::from_fn(|i, j| r[i][j])
}

/// `Matrix3<f64>` 按行序列化
pub mod mat3_f64 {
    use nalgebra::Matrix3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(m: &Matrix3<f64>, s: S) -> Result<S::Ok, S::Error> {
        super::rows(m).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Matrix3<f64>, D::Error> {
        Ok(super::from_rows(<[[f64; 3]; 3]>::deserialize(d)?))
    }
}

/// `Matrix3<i64>` 按行序列化
pub mod mat3_i64 {
    use nalgebra::Matrix3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(m: &Matrix3<i64>, s: S) -> Result<S::Ok, S::Error> {
        super::rows(m).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Matrix3<i64>, D::Error> {
        Ok(super::from_rows(<[[i64; 3]; 3]>::deserialize(d)?))
    }
}

/// `Option<Matrix3<i64>>` 按行序列化，None 为 null
pub mod opt_mat3_i64 {
    use nalgebra::Matrix3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(m: &Option<Matrix3<i64>>, s: S) -> Result<S::Ok, S::Error> {
        m.as_ref().map(super::rows).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Matrix3<i64>>, D::Error> {
        Ok(Option::<[[i64; 3]; 3]>::deserialize(d)?.map(super::from_rows))
    }
}

/// `Vector3<f64>` 序列化为 `[x, y, z]`
pub mod vec3 {
    use nalgebra::Vector3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Vector3<f64>, s: S) -> Result<S::Ok, S::Error> {
        [v.x, v.y, v.z].serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vector3<f64>, D::Error> {
        Ok(Vector3::from(<[f64; 3]>::deserialize(d)?))
    }
}

/// `Vec<Vector3<f64>>` 序列化为 `[[x, y, z], ...]`
pub mod vec3_list {
    use nalgebra::Vector3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &[Vector3<f64>], s: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<[f64; 3]> = v.iter().map(|x| [x.x, x.y, x.z]).collect();
        rows.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vector3<f64>>, D::Error> {
        let rows = Vec::<[f64; 3]>::deserialize(d)?;
        Ok(rows.into_iter().map(Vector3::from).collect())
    }
}
