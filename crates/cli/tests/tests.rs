#[cfg(test)]
mod wal_recovery {
    use memtable::Memtable;
    use wal::{recover, WalRecord, WalWriter};

    #[test]
    fn recover_rebuilds_memtable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.log");

        {
            let mut w = WalWriter::create(&path, true).unwrap();
            w.append(&WalRecord { key: b"a".to_vec(), value: b"1".to_vec() }).unwrap();
            w.append(&WalRecord { key: b"a".to_vec(), value: memtable::TOMBSTONE.to_vec() }).unwrap();
            w.append(&WalRecord { key: b"b".to_vec(), value: b"2".to_vec() }).unwrap();
        }

        let mem = Memtable::new();
        let applied = recover(&path, &mem).unwrap();

        assert_eq!(applied, 3);
        assert!(mem.get(b"a").map(|v| memtable::is_tombstone(&v)).unwrap_or(false));
        assert_eq!(mem.get(b"b").unwrap(), b"2");
    }

    #[test]
    fn recover_survives_mid_write_crash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.log");

        {
            let mut w = WalWriter::create(&path, true).unwrap();
            w.append(&WalRecord { key: b"k".to_vec(), value: b"v".to_vec() }).unwrap();
            // crash here: no in-memory memtable ever saw this record
        }

        let mem = Memtable::new();
        recover(&path, &mem).unwrap();
        assert_eq!(mem.get(b"k").unwrap(), b"v");
    }

    #[test]
    fn recover_detects_crc_corruption() {
        use byteorder::{LittleEndian, WriteBytesExt};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.log");

        let mut body = Vec::new();
        body.write_u32::<LittleEndian>(1).unwrap(); // key_len
        body.extend_from_slice(b"k");
        body.write_u32::<LittleEndian>(1).unwrap(); // val_len
        body.extend_from_slice(b"v");

        let record_len = (body.len() + 4) as u32; // body + crc

        let mut file_bytes = Vec::new();
        file_bytes.write_u32::<LittleEndian>(record_len).unwrap();
        file_bytes.write_u32::<LittleEndian>(0).unwrap(); // bogus CRC
        file_bytes.extend_from_slice(&body);

        std::fs::write(&path, &file_bytes).unwrap();

        let mem = Memtable::new();
        let result = recover(&path, &mem);
        assert!(result.is_err());
    }

    #[test]
    fn recover_missing_file_is_noop() {
        let mem = Memtable::new();
        let applied = recover("/nonexistent/path/wal.log", &mem).unwrap();
        assert_eq!(applied, 0);
    }
}

#[cfg(test)]
mod load_test {
    use memtable::Memtable;

    #[test]
    fn write_load_test() {
        let mem = Memtable::new();

        for i in 0..1_000_000 {
            let key = format!("key{}", i % 10_000).into_bytes();
            let val = vec![b'x'; 100];
            mem.put(key, val);
        }

        assert!(mem.len() <= 10_000);
    }

    #[test]
    fn delete_heavy_workload() {
        let mem = Memtable::new();

        for _ in 0..100_000 {
            mem.put(b"k".to_vec(), b"v".to_vec());
            mem.delete(b"k".to_vec());
        }

        assert!(mem.get(b"k").map(|v| memtable::is_tombstone(&v)).unwrap_or(false));
        assert_eq!(mem.len(), 1);
    }
}
